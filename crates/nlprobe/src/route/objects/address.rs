//! Interface address snapshot.

use super::format_prefix;
use crate::netlink::attr::get;
use crate::netlink::parse::{FromNetlink, PResult, attributes, cut, fixed};
use crate::netlink::MessageBuilder;
use crate::observer::AddrRecord;
use crate::route::cache::CacheObject;
use crate::route::types::IfAddrMsg;
use crate::route::types::ifa::{IFA_ADDRESS, IFA_FLAGS, IFA_LABEL, IFA_LOCAL};

/// An address as last reported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    header: IfAddrMsg,
    address: Option<Vec<u8>>,
    local: Option<Vec<u8>>,
    label: Option<String>,
    flags: Option<u32>,
}

impl Address {
    pub fn ifindex(&self) -> i32 {
        self.header.ifa_index as i32
    }

    pub fn family(&self) -> u8 {
        self.header.ifa_family
    }

    pub fn prefix_len(&self) -> u8 {
        self.header.ifa_prefixlen
    }

    pub fn scope(&self) -> u8 {
        self.header.ifa_scope
    }

    /// Full flag set, falling back to the 8-bit header field on old kernels.
    pub fn flags(&self) -> u32 {
        self.flags.unwrap_or(self.header.ifa_flags as u32)
    }

    /// Local address bytes. On point-to-point links `IFA_ADDRESS` is the
    /// peer, otherwise both attributes hold the same address.
    pub fn local(&self) -> Option<&[u8]> {
        self.local.as_deref().or(self.address.as_deref())
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn record(&self) -> AddrRecord {
        AddrRecord {
            ifindex: self.ifindex(),
            flags: self.flags(),
            family: self.family(),
            scope: self.scope(),
            local: self
                .local()
                .map(|addr| format_prefix(self.family(), addr, self.prefix_len())),
        }
    }
}

impl FromNetlink for Address {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header = fixed::<IfAddrMsg>(input)?;
        let attrs = attributes(input, IFA_FLAGS)?;
        let flags = match attrs.get(IFA_FLAGS) {
            Some(data) => Some(get::u32_ne(data).map_err(|_| cut())?),
            None => None,
        };
        Ok(Self {
            header,
            address: attrs.get(IFA_ADDRESS).map(<[u8]>::to_vec),
            local: attrs.get(IFA_LOCAL).map(<[u8]>::to_vec),
            label: attrs
                .get(IFA_LABEL)
                .map(|data| String::from_utf8_lossy(get::str_bytes(data)).into_owned()),
            flags,
        })
    }

    fn write_dump_header(builder: &mut MessageBuilder) {
        builder.append(&IfAddrMsg::new());
    }
}

impl CacheObject for Address {
    /// Interface, family, prefix length and local address.
    type Key = (i32, u8, u8, Vec<u8>);

    fn key(&self) -> Self::Key {
        (
            self.ifindex(),
            self.family(),
            self.prefix_len(),
            self.local().map(<[u8]>::to_vec).unwrap_or_default(),
        )
    }
}
