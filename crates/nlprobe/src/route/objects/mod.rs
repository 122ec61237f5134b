//! Typed snapshots of rtnetlink objects.

mod address;
mod link;
mod route;

pub use address::Address;
pub use link::Link;
pub use route::{NextHop, Route};

use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Render an address the way routing tools print it.
///
/// IPv4 and IPv6 use their usual notation, anything else is colon
/// separated hex. `/prefixlen` is appended unless the prefix covers the
/// whole address.
pub fn format_prefix(family: u8, addr: &[u8], prefixlen: u8) -> String {
    let mut out = match (family as i32, addr.len()) {
        (libc::AF_INET, 4) => {
            let octets: [u8; 4] = [addr[0], addr[1], addr[2], addr[3]];
            Ipv4Addr::from(octets).to_string()
        }
        (libc::AF_INET6, 16) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(addr);
            Ipv6Addr::from(octets).to_string()
        }
        _ => addr
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":"),
    };
    if prefixlen as usize != addr.len() * 8 {
        let _ = write!(out, "/{prefixlen}");
    }
    out
}
