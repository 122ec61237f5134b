//! The nl80211 event listener.

use std::os::unix::io::{AsRawFd, RawFd};

use tracing::{debug, warn};

use super::nl80211::{
    NL80211_ATTR_BSS, NL80211_ATTR_IFINDEX, NL80211_ATTR_SCAN_SSIDS, NL80211_GENL_NAME,
    NL80211_MULTICAST_GROUP_MLME, NL80211_MULTICAST_GROUP_SCAN, Nl80211Cmd, command_name,
};
use super::scan::{BssFilter, Nl80211Scanner, ScanSource};
use crate::dispatch::{Dispatcher, EventSource};
use crate::netlink::attr::get;
use crate::netlink::genl::{FamilyInfo, GenlMsgHdr, resolve_family};
use crate::netlink::message::{NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST};
use crate::netlink::request::{self, Control};
use crate::netlink::{
    AttrTable, Error, MessageBuilder, NetlinkSocket, Protocol, Result, SocketConfig,
};
use crate::observer::{Observer, ScannedSsid, WlanEvent};

/// nl80211 multicast group ids, `None` when the kernel does not offer one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nl80211Groups {
    pub mlme: Option<u32>,
    pub scan: Option<u32>,
}

impl Nl80211Groups {
    pub fn from_family(family: &FamilyInfo) -> Self {
        Self {
            mlme: family.group(NL80211_MULTICAST_GROUP_MLME),
            scan: family.group(NL80211_MULTICAST_GROUP_SCAN),
        }
    }

    /// Ids to subscribe to.
    pub fn ids(&self) -> impl Iterator<Item = u32> {
        self.mlme.into_iter().chain(self.scan)
    }
}

/// Decode one nl80211 message into the event handed to observers.
///
/// Scan-result, association and new-interface events for a real interface
/// carry a fresh scan dump from `scanner`.
pub fn decode_event<S: ScanSource>(payload: &[u8], scanner: &S) -> Result<WlanEvent> {
    let (genl, data) = GenlMsgHdr::split(payload)?;
    let attrs = AttrTable::parse(data, NL80211_ATTR_BSS)?;
    let ifindex = match attrs.get(NL80211_ATTR_IFINDEX) {
        Some(data) => get::i32_ne(data)?,
        None => -1,
    };

    let filter = match genl.cmd {
        _ if ifindex <= 0 => None,
        Nl80211Cmd::NEW_SCAN_RESULTS => Some(BssFilter::All),
        Nl80211Cmd::ASSOCIATE | Nl80211Cmd::NEW_INTERFACE => Some(BssFilter::WithStatus),
        _ => None,
    };
    let ssids = match filter {
        Some(filter) => Some(scanner.scan_results(ifindex, filter)?),
        None => None,
    };

    Ok(WlanEvent {
        cmd: command_name(genl.cmd),
        ifindex,
        ssids,
    })
}

/// Decode `payload` and hand it to the observer.
///
/// A decoding failure, malformed framing included, is parked in the
/// dispatcher like an observer failure and stops the receive loop.
pub fn handle_event<O, S>(dispatcher: &mut Dispatcher<O>, scanner: &S, payload: &[u8]) -> Control
where
    O: Observer,
    S: ScanSource,
{
    if dispatcher.is_faulted() {
        return Control::Stop;
    }
    match decode_event(payload, scanner) {
        Ok(event) => {
            debug!(cmd = event.cmd, ifindex = event.ifindex, "dispatching wlan event");
            dispatcher.deliver(|o| o.wlan_event(&event))
        }
        Err(e) => dispatcher.capture(e),
    }
}

/// Request asking the kernel to scan on `ifindex` for any SSID.
pub fn trigger_scan_request(family_id: u16, ifindex: i32) -> Result<MessageBuilder> {
    let mut builder = MessageBuilder::genl(
        family_id,
        Nl80211Cmd::TRIGGER_SCAN,
        0,
        NLM_F_REQUEST | NLM_F_ACK,
    );
    builder.put_u32(NL80211_ATTR_IFINDEX, ifindex as u32)?;

    // One zero-length SSID is the wildcard.
    let mut ssids = MessageBuilder::new(0, 0);
    ssids.put_raw(1, &[])?;
    builder.put_nested(NL80211_ATTR_SCAN_SSIDS, &ssids)?;
    Ok(builder)
}

/// Listens to the nl80211 `mlme` and `scan` multicast groups.
///
/// Both sockets are allocated by [`new`](Self::new) and connected by
/// [`start`](Self::start). The owner polls [`fileno`](EventSource::fileno)
/// and calls [`data_ready`](EventSource::data_ready) when it is readable.
pub struct WlanListener<O> {
    dispatcher: Dispatcher<O>,
    request: NetlinkSocket,
    events: NetlinkSocket,
    config: SocketConfig,
    scanner: Option<Nl80211Scanner>,
}

impl<O: Observer> WlanListener<O> {
    pub fn new(observer: O) -> Result<Self> {
        Self::with_config(observer, SocketConfig::default())
    }

    pub fn with_config(observer: O, config: SocketConfig) -> Result<Self> {
        Ok(Self {
            dispatcher: Dispatcher::new(observer),
            request: NetlinkSocket::with_config(Protocol::Generic, config)?,
            events: NetlinkSocket::with_config(Protocol::Generic, config)?,
            config,
            scanner: None,
        })
    }

    /// Resolve nl80211, subscribe to its groups and report every interface.
    pub fn start(&mut self) -> Result<()> {
        if self.scanner.is_some() {
            return Err(Error::InvalidState("wlan listener already started"));
        }

        self.request.connect()?;
        self.events.connect()?;

        let family = resolve_family(
            &self.request,
            NL80211_GENL_NAME,
            &[NL80211_MULTICAST_GROUP_MLME, NL80211_MULTICAST_GROUP_SCAN],
        )?;
        let groups = Nl80211Groups::from_family(&family);
        if groups.mlme.is_none() || groups.scan.is_none() {
            warn!(?groups, "nl80211 does not offer every multicast group");
        }

        self.events.set_non_blocking(true)?;
        for id in groups.ids() {
            self.events.add_membership(id)?;
            debug!(group = id, "subscribed to nl80211 group");
        }

        let scanner = Nl80211Scanner::new(family.id, self.config);
        let builder = MessageBuilder::genl(
            family.id,
            Nl80211Cmd::GET_INTERFACE,
            0,
            NLM_F_REQUEST | NLM_F_DUMP,
        );
        let dispatcher = &mut self.dispatcher;
        let outcome = request::send_and_receive(&self.request, builder, |_, payload| {
            handle_event(dispatcher, &scanner, payload)
        });
        self.scanner = Some(scanner);
        self.dispatcher.settle(outcome)
    }

    fn scanner(&self) -> Result<&Nl80211Scanner> {
        self.scanner
            .as_ref()
            .ok_or(Error::InvalidState("wlan listener not started"))
    }

    /// Ask the kernel to scan on `ifindex`. Results arrive as a
    /// `NEW_SCAN_RESULTS` event.
    pub fn trigger_scan(&self, ifindex: i32) -> Result<()> {
        let scanner = self.scanner()?;
        let builder = trigger_scan_request(scanner.family_id(), ifindex)?;
        let socket = NetlinkSocket::connected(Protocol::Generic, self.config)?;
        request::request_ack(&socket, builder).map_err(|e| e.with_context("triggering scan"))?;
        debug!(ifindex, "scan triggered");
        Ok(())
    }

    /// Dump the kernel's current scan results for `ifindex`.
    pub fn scan_results(&self, ifindex: i32, filter: BssFilter) -> Result<Vec<ScannedSsid>> {
        self.scanner()?.scan_results(ifindex, filter)
    }

    pub fn is_started(&self) -> bool {
        self.scanner.is_some()
    }

    pub fn observer(&self) -> &O {
        self.dispatcher.observer()
    }

    pub fn observer_mut(&mut self) -> &mut O {
        self.dispatcher.observer_mut()
    }

    pub fn into_observer(self) -> O {
        self.dispatcher.into_observer()
    }
}

impl<O> AsRawFd for WlanListener<O> {
    fn as_raw_fd(&self) -> RawFd {
        self.events.as_raw_fd()
    }
}

impl<O: Observer> EventSource for WlanListener<O> {
    fn data_ready(&mut self) -> Result<()> {
        let Some(scanner) = self.scanner.as_ref() else {
            return Err(Error::InvalidState("wlan listener not started"));
        };
        let dispatcher = &mut self.dispatcher;
        let outcome = request::drain(&self.events, |_, payload| {
            handle_event(dispatcher, scanner, payload)
        })
        .map(|drained| {
            if drained.overrun {
                warn!("nl80211 event queue overran, notifications were lost");
            }
            drained.state
        });
        self.dispatcher.settle(outcome)
    }
}

impl<O> std::fmt::Debug for WlanListener<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WlanListener")
            .field("events", &self.events)
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;

    use super::*;
    use crate::netlink::attr::NLA_F_NESTED;
    use crate::netlink::request::tests::{error_message, message};
    use crate::netlink::request::{Exchange, SeqCheck, process_datagram};
    use crate::observer::{BssStatus, ObserverResult};

    /// Serves canned results and records every dump it is asked for.
    #[derive(Default)]
    struct FakeScanner {
        results: Vec<ScannedSsid>,
        fail: bool,
        calls: RefCell<Vec<(i32, BssFilter)>>,
    }

    impl ScanSource for FakeScanner {
        fn scan_results(&self, ifindex: i32, filter: BssFilter) -> Result<Vec<ScannedSsid>> {
            self.calls.borrow_mut().push((ifindex, filter));
            if self.fail {
                return Err(Error::Socket {
                    operation: "socket",
                    source: io::Error::from_raw_os_error(libc::EMFILE),
                });
            }
            Ok(self.results.clone())
        }
    }

    #[derive(Debug, PartialEq)]
    struct Unwanted(&'static str);

    impl std::fmt::Display for Unwanted {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "unwanted event {}", self.0)
        }
    }

    impl std::error::Error for Unwanted {}

    #[derive(Default)]
    struct Recorder {
        events: Vec<WlanEvent>,
        fail_on_call: Option<usize>,
    }

    impl Observer for Recorder {
        fn wlan_event(&mut self, event: &WlanEvent) -> ObserverResult {
            self.events.push(event.clone());
            if self.fail_on_call == Some(self.events.len()) {
                return Err(Box::new(Unwanted(event.cmd)));
            }
            Ok(())
        }
    }

    fn notification(cmd: u8, ifindex: Option<u32>) -> Vec<u8> {
        let mut builder = MessageBuilder::genl(0x1c, cmd, 1, 0);
        if let Some(ifindex) = ifindex {
            builder.put_u32(NL80211_ATTR_IFINDEX, ifindex).unwrap();
        }
        builder.finish()[16..].to_vec()
    }

    fn home() -> ScannedSsid {
        ScannedSsid {
            ssid: b"home".to_vec(),
            status: BssStatus::Connected,
        }
    }

    #[test]
    fn test_scan_results_event() {
        let scanner = FakeScanner {
            results: vec![home()],
            ..Default::default()
        };
        let event = decode_event(&notification(Nl80211Cmd::NEW_SCAN_RESULTS, Some(3)), &scanner).unwrap();
        assert_eq!(event.cmd, "NEW_SCAN_RESULTS");
        assert_eq!(event.ifindex, 3);
        assert_eq!(event.ssids, Some(vec![home()]));
        assert_eq!(*scanner.calls.borrow(), vec![(3, BssFilter::All)]);
    }

    #[test]
    fn test_association_dumps_with_status_only() {
        let scanner = FakeScanner::default();
        for cmd in [Nl80211Cmd::ASSOCIATE, Nl80211Cmd::NEW_INTERFACE] {
            let event = decode_event(&notification(cmd, Some(5)), &scanner).unwrap();
            assert_eq!(event.ssids, Some(vec![]));
        }
        assert_eq!(
            *scanner.calls.borrow(),
            vec![(5, BssFilter::WithStatus), (5, BssFilter::WithStatus)]
        );
    }

    #[test]
    fn test_plain_events() {
        let scanner = FakeScanner::default();

        let event = decode_event(&notification(Nl80211Cmd::TRIGGER_SCAN, Some(3)), &scanner).unwrap();
        assert_eq!(event.cmd, "TRIGGER_SCAN");
        assert_eq!(event.ssids, None);

        // No interface: no dump even for scan results.
        let event = decode_event(&notification(Nl80211Cmd::NEW_SCAN_RESULTS, None), &scanner).unwrap();
        assert_eq!(event.ifindex, -1);
        assert_eq!(event.ssids, None);

        let event = decode_event(&notification(200, Some(3)), &scanner).unwrap();
        assert_eq!(event.cmd, "NL80211_CMD_UNKNOWN");

        assert!(scanner.calls.borrow().is_empty());
    }

    #[test]
    fn test_observer_fault_on_second_of_three() {
        let scanner = FakeScanner::default();
        let mut dispatcher = Dispatcher::new(Recorder {
            fail_on_call: Some(2),
            ..Default::default()
        });

        let mut data = message(0x1c, 0, &notification(Nl80211Cmd::TRIGGER_SCAN, Some(3)));
        data.extend(message(0x1c, 0, &notification(Nl80211Cmd::SCAN_ABORTED, Some(3))));
        data.extend(message(0x1c, 0, &notification(Nl80211Cmd::CONNECT, Some(3))));

        let mut exchange = Exchange::new(SeqCheck::Disabled);
        let outcome = process_datagram(&data, &mut exchange, &mut |_, payload| {
            handle_event(&mut dispatcher, &scanner, payload)
        })
        .map(|()| exchange.state());
        assert!(exchange.is_stopped());

        let cmds: Vec<_> = dispatcher.observer().events.iter().map(|e| e.cmd).collect();
        assert_eq!(cmds, ["TRIGGER_SCAN", "SCAN_ABORTED"]);

        let err = dispatcher.settle(outcome).unwrap_err();
        let inner = err.into_observer_error().unwrap();
        assert_eq!(*inner.downcast::<Unwanted>().unwrap(), Unwanted("SCAN_ABORTED"));
    }

    #[test]
    fn test_scan_failure_becomes_fault() {
        let scanner = FakeScanner {
            fail: true,
            ..Default::default()
        };
        let mut dispatcher = Dispatcher::new(Recorder::default());

        let control = handle_event(
            &mut dispatcher,
            &scanner,
            &notification(Nl80211Cmd::NEW_SCAN_RESULTS, Some(2)),
        );
        assert_eq!(control, Control::Stop);
        assert!(dispatcher.observer().events.is_empty());

        // Nothing is decoded while the fault is pending.
        let control = handle_event(
            &mut dispatcher,
            &scanner,
            &notification(Nl80211Cmd::NEW_SCAN_RESULTS, Some(2)),
        );
        assert_eq!(control, Control::Stop);
        assert_eq!(scanner.calls.borrow().len(), 1);

        let err = dispatcher.settle(Ok(crate::RequestState::Pending)).unwrap_err();
        assert!(matches!(err, Error::Socket { operation: "socket", .. }));
    }

    #[test]
    fn test_malformed_event_is_reported() {
        let scanner = FakeScanner::default();
        let mut dispatcher = Dispatcher::new(Recorder::default());
        assert_eq!(
            handle_event(&mut dispatcher, &scanner, &[0x22]),
            Control::Stop
        );
        assert!(dispatcher.is_faulted());

        let err = dispatcher.settle(Ok(crate::RequestState::Done)).unwrap_err();
        assert!(err.is_malformed());
        assert!(dispatcher.observer().events.is_empty());
    }

    #[test]
    fn test_malformed_event_aborts_datagram() {
        let scanner = FakeScanner::default();
        let mut dispatcher = Dispatcher::new(Recorder::default());

        // Second message's IFINDEX attribute claims more bytes than remain.
        let mut bad = notification(Nl80211Cmd::TRIGGER_SCAN, None);
        bad.extend_from_slice(&[12, 0, NL80211_ATTR_IFINDEX as u8, 0, 3, 0, 0, 0]);

        let mut data = message(0x1c, 0, &notification(Nl80211Cmd::TRIGGER_SCAN, Some(3)));
        data.extend(message(0x1c, 0, &bad));
        data.extend(message(0x1c, 0, &notification(Nl80211Cmd::CONNECT, Some(3))));

        let mut exchange = Exchange::new(SeqCheck::Disabled);
        let outcome = process_datagram(&data, &mut exchange, &mut |_, payload| {
            handle_event(&mut dispatcher, &scanner, payload)
        })
        .map(|()| exchange.state());
        assert!(exchange.is_stopped());

        let cmds: Vec<_> = dispatcher.observer().events.iter().map(|e| e.cmd).collect();
        assert_eq!(cmds, ["TRIGGER_SCAN"]);
        assert!(dispatcher.settle(outcome).unwrap_err().is_malformed());
    }

    #[test]
    fn test_dump_error_settles_as_kernel_error() {
        let mut dispatcher = Dispatcher::new(Recorder::default());
        let mut exchange = Exchange::new(SeqCheck::Strict(4));
        process_datagram(&error_message(4, -libc::EOPNOTSUPP), &mut exchange, &mut |_, _| {
            Control::Continue
        })
        .unwrap();
        let err = dispatcher.settle(Ok(exchange.state())).unwrap_err();
        assert_eq!(err.errno(), Some(libc::EOPNOTSUPP));
    }

    #[test]
    fn test_trigger_scan_request() {
        let msg = trigger_scan_request(0x1c, 3).unwrap().finish();
        let hdr = crate::netlink::NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(hdr.nlmsg_flags, NLM_F_REQUEST | NLM_F_ACK);

        let (genl, data) = GenlMsgHdr::split(&msg[16..]).unwrap();
        assert_eq!(genl.cmd, Nl80211Cmd::TRIGGER_SCAN);
        let attrs = AttrTable::parse(data, NL80211_ATTR_BSS).unwrap();
        assert_eq!(attrs.u32(NL80211_ATTR_IFINDEX).unwrap(), 3);

        // SCAN_SSIDS carries exactly one empty SSID.
        let raw_type = u16::from_ne_bytes([data[8 + 2], data[8 + 3]]);
        assert_eq!(raw_type, NL80211_ATTR_SCAN_SSIDS | NLA_F_NESTED);
        let ssids = attrs.nested(NL80211_ATTR_SCAN_SSIDS, 4).unwrap();
        assert_eq!(ssids.get(1), Some(&[][..]));
        assert_eq!(attrs.bytes(NL80211_ATTR_SCAN_SSIDS).unwrap(), &[4, 0, 1, 0]);
    }

    #[test]
    fn test_groups() {
        let mut family = FamilyInfo {
            id: 0x1c,
            version: 1,
            mcast_groups: Default::default(),
        };
        family.mcast_groups.insert("scan".into(), 5);
        let groups = Nl80211Groups::from_family(&family);
        assert_eq!(groups, Nl80211Groups { mlme: None, scan: Some(5) });
        assert_eq!(groups.ids().collect::<Vec<_>>(), vec![5]);
    }
}
