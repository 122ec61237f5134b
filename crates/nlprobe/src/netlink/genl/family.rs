//! Family and multicast group resolution through `nlctrl`.

use std::collections::HashMap;

use tracing::debug;

use super::header::GenlMsgHdr;
use super::{CtrlAttr, CtrlAttrMcastGrp, CtrlCmd, GENL_ID_CTRL};
use crate::netlink::attr::{AttrIter, AttrTable, get};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{NLM_F_ACK, NLM_F_REQUEST};
use crate::netlink::request::{self, Control, RequestState};
use crate::netlink::socket::NetlinkSocket;

/// Information about a Generic Netlink family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyInfo {
    /// Dynamically assigned family ID (used as nlmsg_type).
    pub id: u16,
    /// Family version.
    pub version: u8,
    /// Requested multicast groups that exist: name -> group ID.
    pub mcast_groups: HashMap<String, u32>,
}

impl FamilyInfo {
    /// Id of a multicast group, `None` when the kernel does not offer it.
    pub fn group(&self, name: &str) -> Option<u32> {
        self.mcast_groups.get(name).copied()
    }
}

/// Resolve a family by name, collecting the ids of the listed multicast groups.
///
/// Groups the kernel does not offer are simply absent from the result.
pub fn resolve_family(socket: &NetlinkSocket, name: &str, groups: &[&str]) -> Result<FamilyInfo> {
    let mut builder = MessageBuilder::genl(
        GENL_ID_CTRL,
        CtrlCmd::GetFamily as u8,
        1,
        NLM_F_REQUEST | NLM_F_ACK,
    );
    builder.put_string(CtrlAttr::FamilyName as u16, name)?;

    let mut found = None;
    let state = request::send_and_receive(socket, builder, |_, payload| {
        found = Some(parse_family(payload, groups));
        Control::Stop
    })?;

    match state {
        RequestState::Failed(code) if code == -libc::ENOENT => {
            return Err(Error::FamilyNotFound {
                name: name.to_string(),
            });
        }
        RequestState::Failed(code) => {
            return Err(Error::from_errno_with_context(
                code,
                format!("resolving generic netlink family {name}"),
            ));
        }
        RequestState::Done | RequestState::Pending => {}
    }

    let info = found.ok_or_else(|| Error::FamilyNotFound {
        name: name.to_string(),
    })??;
    debug!(family = name, id = info.id, groups = ?info.mcast_groups, "resolved generic netlink family");
    Ok(info)
}

/// Parse one `CTRL_CMD_NEWFAMILY` reply payload.
pub(crate) fn parse_family(payload: &[u8], groups: &[&str]) -> Result<FamilyInfo> {
    let (_, attrs_data) = GenlMsgHdr::split(payload)?;
    let attrs = AttrTable::parse(attrs_data, CtrlAttr::McastGroups as u16)?;

    let id = attrs.u16(CtrlAttr::FamilyId as u16)?;
    let version = match attrs.get(CtrlAttr::Version as u16) {
        Some(data) => get::u32_ne(data)? as u8,
        None => 0,
    };

    let mut mcast_groups = HashMap::new();
    if let Some(list) = attrs.get(CtrlAttr::McastGroups as u16) {
        for (_, entry) in AttrIter::new(list) {
            let group = AttrTable::parse(entry, CtrlAttrMcastGrp::Id as u16)?;
            let (Some(group_name), Some(group_id)) = (
                group.get(CtrlAttrMcastGrp::Name as u16),
                group.get(CtrlAttrMcastGrp::Id as u16),
            ) else {
                continue;
            };
            let group_name = get::str_bytes(group_name);
            if let Some(wanted) = groups.iter().find(|g| g.as_bytes() == group_name) {
                mcast_groups.insert((*wanted).to_string(), get::u32_ne(group_id)?);
            }
        }
    }

    Ok(FamilyInfo {
        id,
        version,
        mcast_groups,
    })
}
