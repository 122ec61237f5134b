//! rtnetlink fixed headers and attribute numbers.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interface info message (struct ifinfomsg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct IfInfoMsg {
    /// Address family (usually AF_UNSPEC).
    pub ifi_family: u8,
    pub ifi_pad: u8,
    /// Device type (ARPHRD_*).
    pub ifi_type: u16,
    pub ifi_index: i32,
    /// Device flags (IFF_*).
    pub ifi_flags: u32,
    /// Mask of the flags a change request touches.
    pub ifi_change: u32,
}

impl IfInfoMsg {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.ifi_index = index;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.ifi_flags = flags;
        self
    }

    pub fn with_change(mut self, change: u32) -> Self {
        self.ifi_change = change;
        self
    }
}

/// Interface address message (struct ifaddrmsg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct IfAddrMsg {
    pub ifa_family: u8,
    pub ifa_prefixlen: u8,
    /// Legacy 8-bit flags; `IFA_FLAGS` carries the full set.
    pub ifa_flags: u8,
    pub ifa_scope: u8,
    pub ifa_index: u32,
}

impl IfAddrMsg {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new() -> Self {
        Self::default()
    }
}

/// Route message (struct rtmsg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct RtMsg {
    pub rtm_family: u8,
    pub rtm_dst_len: u8,
    pub rtm_src_len: u8,
    pub rtm_tos: u8,
    /// Table id, `RT_TABLE_COMPAT` when the real id only fits `RTA_TABLE`.
    pub rtm_table: u8,
    pub rtm_protocol: u8,
    pub rtm_scope: u8,
    /// Route type (RTN_*).
    pub rtm_type: u8,
    pub rtm_flags: u32,
}

impl RtMsg {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new() -> Self {
        Self::default()
    }
}

/// One entry of `RTA_MULTIPATH` (struct rtnexthop).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct RtNexthop {
    /// Length of the entry including its attributes.
    pub rtnh_len: u16,
    pub rtnh_flags: u8,
    pub rtnh_hops: u8,
    pub rtnh_ifindex: i32,
}

impl RtNexthop {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Route was cloned from another route (a cache entry, not configuration).
pub const RTM_F_CLONED: u32 = 0x200;

/// Link attributes (IFLA_*).
pub mod ifla {
    pub const IFLA_ADDRESS: u16 = 1;
    pub const IFLA_IFNAME: u16 = 3;
    pub const IFLA_MTU: u16 = 4;
    pub const IFLA_OPERSTATE: u16 = 16;
}

/// Address attributes (IFA_*).
pub mod ifa {
    pub const IFA_ADDRESS: u16 = 1;
    pub const IFA_LOCAL: u16 = 2;
    pub const IFA_LABEL: u16 = 3;
    pub const IFA_FLAGS: u16 = 8;
}

/// Route attributes (RTA_*).
pub mod rta {
    pub const RTA_DST: u16 = 1;
    pub const RTA_OIF: u16 = 4;
    pub const RTA_GATEWAY: u16 = 5;
    pub const RTA_PRIORITY: u16 = 6;
    pub const RTA_MULTIPATH: u16 = 9;
    pub const RTA_TABLE: u16 = 15;
}
