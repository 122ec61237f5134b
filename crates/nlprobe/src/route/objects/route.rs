//! Route snapshot.

use winnow::prelude::*;
use winnow::token::take;

use super::format_prefix;
use crate::netlink::attr::{AttrTable, get, nla_align};
use crate::netlink::parse::{FromNetlink, PResult, attributes, cut, fixed};
use crate::netlink::MessageBuilder;
use crate::observer::RouteRecord;
use crate::route::cache::CacheObject;
use crate::route::types::rta::{
    RTA_DST, RTA_GATEWAY, RTA_MULTIPATH, RTA_OIF, RTA_PRIORITY, RTA_TABLE,
};
use crate::route::types::{RTM_F_CLONED, RtMsg, RtNexthop};

/// One next hop of a multipath route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextHop {
    pub ifindex: i32,
    pub flags: u8,
    /// Weight minus one.
    pub hops: u8,
    pub gateway: Option<Vec<u8>>,
}

/// A route as last reported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    header: RtMsg,
    dst: Option<Vec<u8>>,
    oif: Option<i32>,
    gateway: Option<Vec<u8>>,
    priority: Option<u32>,
    table: Option<u32>,
    multipath: Vec<NextHop>,
}

impl Route {
    pub fn family(&self) -> u8 {
        self.header.rtm_family
    }

    pub fn dst_len(&self) -> u8 {
        self.header.rtm_dst_len
    }

    /// Route type (RTN_*).
    pub fn route_type(&self) -> u8 {
        self.header.rtm_type
    }

    /// Table id, `RTA_TABLE` taking precedence over the 8-bit header field.
    pub fn table_id(&self) -> u32 {
        self.table.unwrap_or(self.header.rtm_table as u32)
    }

    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    pub fn gateway(&self) -> Option<&[u8]> {
        self.gateway.as_deref()
    }

    pub fn multipath(&self) -> &[NextHop] {
        &self.multipath
    }

    pub fn is_cloned(&self) -> bool {
        self.header.rtm_flags & RTM_F_CLONED != 0
    }

    pub fn is_default(&self) -> bool {
        self.header.rtm_dst_len == 0 || self.dst.as_ref().is_none_or(Vec::is_empty)
    }

    /// Destination prefix, `"default"` for the default route.
    pub fn dst(&self) -> String {
        match &self.dst {
            Some(dst) if !self.is_default() => format_prefix(self.family(), dst, self.dst_len()),
            _ => "default".to_string(),
        }
    }

    /// Interface of the first next hop, -1 when the route has none.
    pub fn ifindex(&self) -> i32 {
        self.multipath
            .first()
            .map(|nh| nh.ifindex)
            .or(self.oif)
            .unwrap_or(-1)
    }

    pub fn record(&self) -> RouteRecord {
        RouteRecord {
            family: self.family(),
            route_type: self.route_type(),
            table: self.table_id(),
            dst: self.dst(),
            ifindex: self.ifindex(),
        }
    }
}

/// One `struct rtnexthop` and the attributes it carries.
fn next_hop(input: &mut &[u8]) -> PResult<NextHop> {
    let available = input.len();
    let header = fixed::<RtNexthop>(input)?;
    let len = header.rtnh_len as usize;
    if len < RtNexthop::SIZE || len > available {
        return Err(cut());
    }
    let attrs_data: &[u8] = take(len - RtNexthop::SIZE).parse_next(input)?;
    let padding = (nla_align(len) - len).min(input.len());
    *input = &input[padding..];

    let attrs = AttrTable::parse(attrs_data, RTA_GATEWAY).map_err(|_| cut())?;
    Ok(NextHop {
        ifindex: header.rtnh_ifindex,
        flags: header.rtnh_flags,
        hops: header.rtnh_hops,
        gateway: attrs.get(RTA_GATEWAY).map(<[u8]>::to_vec),
    })
}

fn next_hops(mut input: &[u8]) -> PResult<Vec<NextHop>> {
    let mut hops = Vec::new();
    while input.len() >= RtNexthop::SIZE {
        hops.push(next_hop(&mut input)?);
    }
    Ok(hops)
}

fn u32_attr(attrs: &AttrTable<'_>, attr: u16) -> PResult<Option<u32>> {
    match attrs.get(attr) {
        Some(data) => get::u32_ne(data).map(Some).map_err(|_| cut()),
        None => Ok(None),
    }
}

impl FromNetlink for Route {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header = fixed::<RtMsg>(input)?;
        let attrs = attributes(input, RTA_TABLE)?;
        let multipath = match attrs.get(RTA_MULTIPATH) {
            Some(data) => next_hops(data)?,
            None => Vec::new(),
        };
        Ok(Self {
            header,
            dst: attrs.get(RTA_DST).map(<[u8]>::to_vec),
            oif: u32_attr(&attrs, RTA_OIF)?.map(|oif| oif as i32),
            gateway: attrs.get(RTA_GATEWAY).map(<[u8]>::to_vec),
            priority: u32_attr(&attrs, RTA_PRIORITY)?,
            table: u32_attr(&attrs, RTA_TABLE)?,
            multipath,
        })
    }

    fn write_dump_header(builder: &mut MessageBuilder) {
        builder.append(&RtMsg::new());
    }
}

impl CacheObject for Route {
    /// Family, table, TOS, destination prefix and priority.
    type Key = (u8, u32, u8, u8, Vec<u8>, u32);

    fn key(&self) -> Self::Key {
        (
            self.family(),
            self.table_id(),
            self.header.rtm_tos,
            self.dst_len(),
            self.dst.clone().unwrap_or_default(),
            self.priority.unwrap_or(0),
        )
    }

    /// Cloned routes are kernel cache entries, not configuration.
    fn is_cacheable(&self) -> bool {
        !self.is_cloned()
    }
}
