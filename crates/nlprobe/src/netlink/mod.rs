//! Netlink protocol plumbing shared by both listeners.

pub mod attr;
mod builder;
mod error;
pub mod genl;
pub mod message;
pub mod parse;
pub mod request;
mod socket;

pub use attr::{AttrIter, AttrTable, NlAttr};
pub use builder::{MessageBuilder, NestToken};
pub use error::{Error, ObserverError, Result};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use request::{Control, Drained, RequestState, SeqCheck};
pub use socket::{NetlinkSocket, Protocol, SocketConfig, rtnetlink_groups};
