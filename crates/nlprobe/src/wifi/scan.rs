//! BSS dumps and their decoding.

use tracing::{debug, warn};

use super::ie;
use super::nl80211::{
    NL80211_ATTR_BSS, NL80211_ATTR_IFINDEX, NL80211_BSS_INFORMATION_ELEMENTS, NL80211_BSS_STATUS,
    Nl80211Cmd,
};
use crate::netlink::attr::get;
use crate::netlink::genl::GenlMsgHdr;
use crate::netlink::message::{NLM_F_DUMP, NLM_F_REQUEST};
use crate::netlink::request::{self, Control, RequestState};
use crate::netlink::{
    AttrTable, Error, MessageBuilder, NetlinkSocket, Protocol, Result, SocketConfig,
};
use crate::observer::{BssStatus, ScannedSsid};

/// Which BSS entries a dump keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BssFilter {
    /// Every BSS that advertises an SSID.
    All,
    /// Only BSS entries carrying an association status.
    WithStatus,
}

/// Where scan results come from.
///
/// The listener fetches results while decoding an event; the event decoder
/// is written against this trait so it can run without a kernel.
pub trait ScanSource {
    fn scan_results(&self, ifindex: i32, filter: BssFilter) -> Result<Vec<ScannedSsid>>;
}

/// Dumps `NL80211_CMD_GET_SCAN` on a fresh generic netlink socket per call.
#[derive(Debug, Clone, Copy)]
pub struct Nl80211Scanner {
    family_id: u16,
    config: SocketConfig,
}

impl Nl80211Scanner {
    pub fn new(family_id: u16, config: SocketConfig) -> Self {
        Self { family_id, config }
    }

    /// Resolved nl80211 family id.
    pub fn family_id(&self) -> u16 {
        self.family_id
    }

    /// Build the dump request for one interface.
    pub fn dump_request(&self, ifindex: i32) -> Result<MessageBuilder> {
        let mut builder = MessageBuilder::genl(
            self.family_id,
            Nl80211Cmd::GET_SCAN,
            0,
            NLM_F_REQUEST | NLM_F_DUMP,
        );
        builder.put_u32(NL80211_ATTR_IFINDEX, ifindex as u32)?;
        Ok(builder)
    }
}

impl ScanSource for Nl80211Scanner {
    fn scan_results(&self, ifindex: i32, filter: BssFilter) -> Result<Vec<ScannedSsid>> {
        let socket = NetlinkSocket::connected(Protocol::Generic, self.config)?;
        let builder = self.dump_request(ifindex)?;

        let mut collector = BssCollector::new(filter);
        let state = request::send_and_receive(&socket, builder, |_, payload| {
            collector.accept(payload)
        })?;
        collector.finish(ifindex, state)
    }
}

/// Gathers the BSS entries of one scan dump.
#[derive(Debug)]
pub struct BssCollector {
    filter: BssFilter,
    ssids: Vec<ScannedSsid>,
    malformed: Option<Error>,
}

impl BssCollector {
    pub fn new(filter: BssFilter) -> Self {
        Self {
            filter,
            ssids: Vec::new(),
            malformed: None,
        }
    }

    /// Decode one dump message. The first malformed message ends collection.
    pub fn accept(&mut self, payload: &[u8]) -> Control {
        match bss_from_scan_message(payload, self.filter) {
            Ok(Some(entry)) => {
                self.ssids.push(entry);
                Control::Continue
            }
            Ok(None) => Control::Continue,
            Err(e) => {
                self.malformed = Some(e);
                Control::Stop
            }
        }
    }

    /// Entries gathered once the dump has settled.
    ///
    /// A malformed message fails the dump. A kernel error ending the dump
    /// early keeps what arrived before it.
    pub fn finish(self, ifindex: i32, state: RequestState) -> Result<Vec<ScannedSsid>> {
        if let Some(e) = self.malformed {
            return Err(e);
        }
        if let RequestState::Failed(code) = state {
            warn!(
                ifindex,
                errno = -code,
                kept = self.ssids.len(),
                "scan dump ended with a kernel error, keeping partial results"
            );
        }
        debug!(ifindex, filter = ?self.filter, count = self.ssids.len(), "dumped scan results");
        Ok(self.ssids)
    }
}

/// Decode one `NL80211_CMD_NEW_SCAN_RESULTS` dump message.
///
/// `Ok(None)` for messages without an interface index or BSS, and for BSS
/// entries the filter drops.
pub fn bss_from_scan_message(payload: &[u8], filter: BssFilter) -> Result<Option<ScannedSsid>> {
    let (_, data) = GenlMsgHdr::split(payload)?;
    let attrs = AttrTable::parse(data, NL80211_ATTR_BSS)?;
    if !attrs.has(NL80211_ATTR_IFINDEX) || !attrs.has(NL80211_ATTR_BSS) {
        return Ok(None);
    }
    let bss = attrs.nested(NL80211_ATTR_BSS, NL80211_BSS_STATUS)?;
    parse_bss(&bss, filter)
}

/// Pick the SSID and status out of a parsed `NL80211_ATTR_BSS`.
pub fn parse_bss(bss: &AttrTable<'_>, filter: BssFilter) -> Result<Option<ScannedSsid>> {
    let status = match bss.get(NL80211_BSS_STATUS) {
        Some(data) => Some(get::u32_ne(data)?),
        None => None,
    };
    if filter == BssFilter::WithStatus && status.is_none() {
        return Ok(None);
    }

    let Some(ies) = bss.get(NL80211_BSS_INFORMATION_ELEMENTS) else {
        return Ok(None);
    };
    let Some(ssid) = ie::ssid(ies) else {
        return Ok(None);
    };

    Ok(Some(ScannedSsid {
        ssid: ssid.to_vec(),
        status: status.map_or(BssStatus::NoStatus, BssStatus::from_raw),
    }))
}
