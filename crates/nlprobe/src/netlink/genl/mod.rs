//! Generic Netlink (GENL) support.
//!
//! Generic netlink multiplexes many named families over one protocol. Their
//! ids and multicast group ids are assigned by the kernel when the owning
//! module registers, so they are looked up through the fixed control family
//! (`nlctrl`) every time a listener starts.

mod family;
mod header;

pub use family::{FamilyInfo, resolve_family};
pub use header::{GENL_HDRLEN, GenlMsgHdr};

/// Control family id. Fixed by the kernel ABI, unlike every other family.
pub const GENL_ID_CTRL: u16 = 0x10;

/// Control family commands
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCmd {
    Unspec = 0,
    NewFamily = 1,
    DelFamily = 2,
    GetFamily = 3,
}

/// Control family attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttr {
    Unspec = 0,
    FamilyId = 1,
    FamilyName = 2,
    Version = 3,
    HdrSize = 4,
    MaxAttr = 5,
    Ops = 6,
    McastGroups = 7,
}

/// Control family multicast group attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttrMcastGrp {
    Unspec = 0,
    Name = 1,
    Id = 2,
}
