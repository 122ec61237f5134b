//! Link (network interface) snapshot.

use crate::netlink::attr::get;
use crate::netlink::parse::{FromNetlink, PResult, attributes, cut, fixed};
use crate::netlink::MessageBuilder;
use crate::observer::LinkRecord;
use crate::route::cache::CacheObject;
use crate::route::types::IfInfoMsg;
use crate::route::types::ifla::{IFLA_IFNAME, IFLA_MTU, IFLA_OPERSTATE};

/// A link as last reported by the kernel.
///
/// Two snapshots compare equal when the header, name, MTU and operational
/// state match. `ifi_change` is cleared on parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    header: IfInfoMsg,
    name: Option<String>,
    mtu: Option<u32>,
    operstate: Option<u8>,
}

impl Link {
    pub fn ifindex(&self) -> i32 {
        self.header.ifi_index
    }

    /// Device flags (IFF_*).
    pub fn flags(&self) -> u32 {
        self.header.ifi_flags
    }

    /// Device type (ARPHRD_*).
    pub fn arptype(&self) -> u16 {
        self.header.ifi_type
    }

    pub fn family(&self) -> u8 {
        self.header.ifi_family
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }

    /// RFC 2863 operational state (IF_OPER_*).
    pub fn operstate(&self) -> Option<u8> {
        self.operstate
    }

    pub fn is_up(&self) -> bool {
        self.header.ifi_flags & libc::IFF_UP as u32 != 0
    }

    pub fn record(&self) -> LinkRecord {
        LinkRecord {
            ifindex: self.ifindex(),
            flags: self.flags(),
            arptype: self.arptype(),
            family: self.family(),
            name: self.name.clone(),
        }
    }
}

impl FromNetlink for Link {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header = fixed::<IfInfoMsg>(input)?.with_change(0);
        let attrs = attributes(input, IFLA_OPERSTATE)?;
        let name = attrs
            .get(IFLA_IFNAME)
            .map(|data| String::from_utf8_lossy(get::str_bytes(data)).into_owned());
        let mtu = match attrs.get(IFLA_MTU) {
            Some(data) => Some(get::u32_ne(data).map_err(|_| cut())?),
            None => None,
        };
        let operstate = match attrs.get(IFLA_OPERSTATE) {
            Some(data) => Some(get::u8(data).map_err(|_| cut())?),
            None => None,
        };
        Ok(Self {
            header,
            name,
            mtu,
            operstate,
        })
    }

    fn write_dump_header(builder: &mut MessageBuilder) {
        builder.append(&IfInfoMsg::new());
    }
}

impl CacheObject for Link {
    type Key = i32;

    fn key(&self) -> i32 {
        self.ifindex()
    }

    /// Per-family link messages (bridge ports and the like) are not links.
    fn is_cacheable(&self) -> bool {
        self.header.ifi_family == libc::AF_UNSPEC as u8
    }
}
