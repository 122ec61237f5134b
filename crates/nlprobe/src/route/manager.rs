//! Link, address and route caches kept current by one multicast socket.

use tracing::{debug, trace, warn};

use super::cache::{CacheObject, ObjectCache};
use super::objects::{Address, Link, Route};
use crate::netlink::parse::FromNetlink;
use crate::netlink::request::{self, Control, Exchange, SeqCheck};
use crate::netlink::rtnetlink_groups::{
    RTNLGRP_IPV4_IFADDR, RTNLGRP_IPV4_ROUTE, RTNLGRP_IPV6_IFADDR, RTNLGRP_IPV6_ROUTE, RTNLGRP_LINK,
};
use crate::netlink::{
    Error, MessageBuilder, NetlinkSocket, NlMsgType, Protocol, RequestState, Result, SocketConfig,
};
use crate::observer::{Action, Observer, ObserverResult};

/// Groups the event socket joins.
pub const ROUTE_GROUPS: [u32; 5] = [
    RTNLGRP_LINK,
    RTNLGRP_IPV4_IFADDR,
    RTNLGRP_IPV6_IFADDR,
    RTNLGRP_IPV4_ROUTE,
    RTNLGRP_IPV6_ROUTE,
];

/// A change applied to one of the caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Link(Action, Link),
    Addr(Action, Address),
    Route(Action, Route),
}

impl CacheEvent {
    pub fn action(&self) -> Action {
        match self {
            Self::Link(action, _) | Self::Addr(action, _) | Self::Route(action, _) => *action,
        }
    }

    /// Hand the event to the matching observer method.
    pub fn deliver<O: Observer + ?Sized>(&self, observer: &mut O) -> ObserverResult {
        match self {
            Self::Link(action, link) => observer.link_change(*action, &link.record()),
            Self::Addr(action, addr) => observer.addr_change(*action, &addr.record()),
            Self::Route(action, route) => observer.route_change(*action, &route.record()),
        }
    }
}

/// Result of dumping every object kind once.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub links: Vec<Link>,
    pub addrs: Vec<Address>,
    pub routes: Vec<Route>,
}

impl Snapshot {
    /// Dump links, addresses and routes over a short-lived socket.
    pub fn fetch(config: SocketConfig) -> Result<Self> {
        let socket = NetlinkSocket::connected(Protocol::Route, config)?;
        Ok(Self {
            links: dump(&socket, NlMsgType::RTM_GETLINK, "links")?,
            addrs: dump(&socket, NlMsgType::RTM_GETADDR, "addresses")?,
            routes: dump(&socket, NlMsgType::RTM_GETROUTE, "routes")?,
        })
    }
}

fn dump<T>(socket: &NetlinkSocket, msg_type: u16, what: &'static str) -> Result<Vec<T>>
where
    T: FromNetlink + CacheObject,
{
    let mut builder = MessageBuilder::dump(msg_type);
    T::write_dump_header(&mut builder);

    let mut objects = Vec::new();
    let mut malformed = None;
    let state = request::send_and_receive(socket, builder, |_, payload| {
        collect(&mut objects, &mut malformed, payload)
    })?;
    let objects = settle_dump(objects, malformed, state, what)?;
    debug!(what, count = objects.len(), "dump complete");
    Ok(objects)
}

/// Parse one dump message into `objects`, stopping at the first malformed one.
fn collect<T: FromNetlink>(
    objects: &mut Vec<T>,
    malformed: &mut Option<Error>,
    payload: &[u8],
) -> Control {
    match T::from_bytes(payload) {
        Ok(obj) => {
            objects.push(obj);
            Control::Continue
        }
        Err(e) => {
            *malformed = Some(e);
            Control::Stop
        }
    }
}

fn settle_dump<T>(
    objects: Vec<T>,
    malformed: Option<Error>,
    state: RequestState,
    what: &'static str,
) -> Result<Vec<T>> {
    if let Some(e) = malformed {
        return Err(e);
    }
    if let RequestState::Failed(code) = state {
        return Err(Error::from_errno_with_context(code, format!("dumping {what}")));
    }
    Ok(objects)
}

/// The three caches.
#[derive(Debug, Clone, Default)]
pub struct Caches {
    pub links: ObjectCache<Link>,
    pub addrs: ObjectCache<Address>,
    pub routes: ObjectCache<Route>,
}

impl Caches {
    pub fn fill(&mut self, snapshot: Snapshot) {
        self.links.fill(snapshot.links);
        self.addrs.fill(snapshot.addrs);
        self.routes.fill(snapshot.routes);
    }

    /// Everything cached, reported as new: links, then addresses, then routes.
    pub fn replay(&self) -> Vec<CacheEvent> {
        let links = self.links.iter().map(|l| CacheEvent::Link(Action::New, l.clone()));
        let addrs = self.addrs.iter().map(|a| CacheEvent::Addr(Action::New, a.clone()));
        let routes = self
            .routes
            .iter()
            .map(|r| CacheEvent::Route(Action::New, r.clone()));
        links.chain(addrs).chain(routes).collect()
    }

    /// Replace every cache with `snapshot` and report what changed.
    pub fn resync(&mut self, snapshot: Snapshot) -> Vec<CacheEvent> {
        let links = self.links.resync(snapshot.links);
        let addrs = self.addrs.resync(snapshot.addrs);
        let routes = self.routes.resync(snapshot.routes);
        links
            .into_iter()
            .map(|(a, l)| CacheEvent::Link(a, l))
            .chain(addrs.into_iter().map(|(a, x)| CacheEvent::Addr(a, x)))
            .chain(routes.into_iter().map(|(a, r)| CacheEvent::Route(a, r)))
            .collect()
    }

    /// Apply one notification.
    ///
    /// `Ok(None)` when nothing changed or the message type is not cached.
    pub fn apply(&mut self, msg_type: u16, payload: &[u8]) -> Result<Option<CacheEvent>> {
        let event = match msg_type {
            NlMsgType::RTM_NEWLINK => self
                .links
                .include(Link::from_bytes(payload)?)
                .map(|(a, l)| CacheEvent::Link(a, l)),
            NlMsgType::RTM_DELLINK => self
                .links
                .remove(&Link::from_bytes(payload)?)
                .map(|(a, l)| CacheEvent::Link(a, l)),
            NlMsgType::RTM_NEWADDR => self
                .addrs
                .include(Address::from_bytes(payload)?)
                .map(|(a, x)| CacheEvent::Addr(a, x)),
            NlMsgType::RTM_DELADDR => self
                .addrs
                .remove(&Address::from_bytes(payload)?)
                .map(|(a, x)| CacheEvent::Addr(a, x)),
            NlMsgType::RTM_NEWROUTE => self
                .routes
                .include(Route::from_bytes(payload)?)
                .map(|(a, r)| CacheEvent::Route(a, r)),
            NlMsgType::RTM_DELROUTE => self
                .routes
                .remove(&Route::from_bytes(payload)?)
                .map(|(a, r)| CacheEvent::Route(a, r)),
            other => {
                trace!(msg_type = other, "ignoring rtnetlink message");
                None
            }
        };
        Ok(event)
    }
}

/// Apply one notification. The first malformed one is parked and stops the loop.
fn absorb<F>(
    caches: &mut Caches,
    malformed: &mut Option<Error>,
    on_event: &mut F,
    msg_type: u16,
    payload: &[u8],
) -> Control
where
    F: FnMut(CacheEvent),
{
    match caches.apply(msg_type, payload) {
        Ok(Some(event)) => {
            on_event(event);
            Control::Continue
        }
        Ok(None) => Control::Continue,
        Err(e) => {
            debug!(msg_type, error = %e, "malformed rtnetlink notification");
            *malformed = Some(e);
            Control::Stop
        }
    }
}

/// Owns the event socket and the caches it maintains.
#[derive(Debug)]
pub struct CacheManager {
    socket: NetlinkSocket,
    config: SocketConfig,
    caches: Caches,
}

impl CacheManager {
    /// Allocate the event socket.
    pub fn new(config: SocketConfig) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::with_config(Protocol::Route, config)?,
            config,
            caches: Caches::default(),
        })
    }

    /// Connect the event socket and join the link, address and route groups.
    ///
    /// Subscribing before the initial dump means no change can fall between
    /// the dump and the first notification.
    pub fn connect(&mut self) -> Result<()> {
        self.socket.connect()?;
        self.socket.set_non_blocking(true)?;
        for group in ROUTE_GROUPS {
            self.socket.add_membership(group)?;
        }
        debug!(groups = ?ROUTE_GROUPS, "subscribed to rtnetlink groups");
        Ok(())
    }

    /// Fill the caches from scratch without reporting anything.
    pub fn refill(&mut self) -> Result<()> {
        self.caches.fill(Snapshot::fetch(self.config)?);
        debug!(
            links = self.caches.links.len(),
            addrs = self.caches.addrs.len(),
            routes = self.caches.routes.len(),
            "caches filled"
        );
        Ok(())
    }

    /// Re-dump everything and report the difference.
    pub fn resync(&mut self) -> Result<Vec<CacheEvent>> {
        let snapshot = Snapshot::fetch(self.config)?;
        Ok(self.caches.resync(snapshot))
    }

    /// Apply every queued notification, handing each change to `on_event`.
    ///
    /// A malformed notification aborts the drain and is returned; messages
    /// after it in the same datagram are not applied. When the kernel
    /// reports dropped notifications the caches are resynchronised and the
    /// difference reported through `on_event` as well.
    pub fn drain<F>(&mut self, mut on_event: F) -> Result<RequestState>
    where
        F: FnMut(CacheEvent),
    {
        let caches = &mut self.caches;
        let mut malformed = None;
        let drained = request::drain(&self.socket, |header, payload| {
            absorb(caches, &mut malformed, &mut on_event, header.nlmsg_type, payload)
        })?;
        if let Some(e) = malformed {
            return Err(e);
        }

        if drained.overrun {
            warn!("rtnetlink notifications were dropped, resynchronising caches");
            for event in self.resync()? {
                on_event(event);
            }
        }
        Ok(drained.state)
    }

    /// Apply the notifications in one datagram already read off the socket.
    pub fn apply_datagram<F>(&mut self, data: &[u8], mut on_event: F) -> Result<RequestState>
    where
        F: FnMut(CacheEvent),
    {
        let caches = &mut self.caches;
        let mut malformed = None;
        let mut exchange = Exchange::new(SeqCheck::Disabled);
        request::process_datagram(data, &mut exchange, &mut |header, payload| {
            absorb(caches, &mut malformed, &mut on_event, header.nlmsg_type, payload)
        })?;
        match malformed {
            Some(e) => Err(e),
            None => Ok(exchange.state()),
        }
    }

    pub fn caches_mut(&mut self) -> &mut Caches {
        &mut self.caches
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn config(&self) -> SocketConfig {
        self.config
    }

    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::request::tests::message;
    use crate::route::fixtures;

    fn snapshot() -> Snapshot {
        Snapshot {
            links: vec![
                Link::from_bytes(&fixtures::link_loopback()).unwrap(),
                Link::from_bytes(&fixtures::link_eth0(0x1043)).unwrap(),
            ],
            addrs: vec![Address::from_bytes(&fixtures::addr_v4([192, 168, 1, 20], 24)).unwrap()],
            routes: vec![Route::from_bytes(&fixtures::route_default_v4()).unwrap()],
        }
    }

    #[test]
    fn test_replay_order() {
        let mut caches = Caches::default();
        caches.fill(snapshot());
        let kinds: Vec<_> = caches
            .replay()
            .iter()
            .map(|event| match event {
                CacheEvent::Link(Action::New, l) => format!("link {}", l.ifindex()),
                CacheEvent::Addr(Action::New, a) => format!("addr {}", a.ifindex()),
                CacheEvent::Route(Action::New, r) => format!("route {}", r.dst()),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(kinds, ["link 1", "link 2", "addr 2", "route default"]);
    }

    #[test]
    fn test_apply_link_updates() {
        let mut caches = Caches::default();
        caches.fill(snapshot());

        // Same content: nothing to report.
        let event = caches
            .apply(NlMsgType::RTM_NEWLINK, &fixtures::link_eth0(0x1043))
            .unwrap();
        assert_eq!(event, None);

        // eth0 goes down.
        let event = caches
            .apply(NlMsgType::RTM_NEWLINK, &fixtures::link_eth0(0x1002))
            .unwrap()
            .unwrap();
        assert_eq!(event.action(), Action::Change);
        assert_eq!(caches.links.get(&2).unwrap().flags(), 0x1002);

        let event = caches
            .apply(NlMsgType::RTM_DELLINK, &fixtures::link_eth0(0x1002))
            .unwrap()
            .unwrap();
        assert_eq!(event.action(), Action::Del);
        assert!(caches.links.get(&2).is_none());

        // Deleting an unknown link is silent.
        let event = caches
            .apply(NlMsgType::RTM_DELLINK, &fixtures::link_eth0(0x1002))
            .unwrap();
        assert_eq!(event, None);
    }

    #[test]
    fn test_apply_mtu_change() {
        let mut caches = Caches::default();
        caches.fill(snapshot());

        let jumbo = fixtures::with_mtu(fixtures::link_eth0(0x1043), 9000);
        let event = caches
            .apply(NlMsgType::RTM_NEWLINK, &jumbo)
            .unwrap()
            .unwrap();
        assert_eq!(event.action(), Action::Change);
        assert_eq!(caches.links.get(&2).unwrap().mtu(), Some(9000));

        // Flags unchanged, only the MTU moved: still a change.
        let event = caches
            .apply(NlMsgType::RTM_NEWLINK, &fixtures::with_mtu(fixtures::link_eth0(0x1043), 1500))
            .unwrap();
        assert!(matches!(event, Some(CacheEvent::Link(Action::Change, _))));
    }

    #[test]
    fn test_apply_new_address_and_route() {
        let mut caches = Caches::default();
        let event = caches
            .apply(NlMsgType::RTM_NEWADDR, &fixtures::addr_v4([10, 0, 0, 5], 8))
            .unwrap()
            .unwrap();
        assert!(matches!(event, CacheEvent::Addr(Action::New, _)));

        let event = caches
            .apply(NlMsgType::RTM_NEWROUTE, &fixtures::route_multipath_v4())
            .unwrap()
            .unwrap();
        let CacheEvent::Route(Action::New, route) = event else {
            panic!("expected a new route");
        };
        assert_eq!(route.ifindex(), 3);
    }

    #[test]
    fn test_cloned_route_ignored() {
        let mut caches = Caches::default();
        let mut data = fixtures::route_v4([10, 1, 2, 3], 32, 3);
        data[8..12].copy_from_slice(&crate::route::types::RTM_F_CLONED.to_ne_bytes());
        assert_eq!(caches.apply(NlMsgType::RTM_NEWROUTE, &data).unwrap(), None);
        assert!(caches.routes.is_empty());
    }

    #[test]
    fn test_apply_ignores_other_types() {
        let mut caches = Caches::default();
        assert_eq!(caches.apply(28, &[0; 12]).unwrap(), None);
    }

    #[test]
    fn test_apply_malformed() {
        let mut caches = Caches::default();
        let err = caches.apply(NlMsgType::RTM_NEWLINK, &[0; 6]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_resync_events() {
        let mut caches = Caches::default();
        caches.fill(snapshot());

        let mut fresh = snapshot();
        fresh.links[1] = Link::from_bytes(&fixtures::link_eth0(0x1002)).unwrap();
        fresh.addrs.clear();
        fresh
            .routes
            .push(Route::from_bytes(&fixtures::route_v4([192, 168, 1, 0], 24, 2)).unwrap());

        let actions: Vec<_> = caches
            .resync(fresh)
            .iter()
            .map(|event| match event {
                CacheEvent::Link(a, _) => format!("link {a}"),
                CacheEvent::Addr(a, _) => format!("addr {a}"),
                CacheEvent::Route(a, _) => format!("route {a}"),
            })
            .collect();
        assert_eq!(actions, ["link CHANGE", "addr DEL", "route NEW"]);
    }

    #[test]
    fn test_dump_stops_at_malformed_object() {
        let mut objects: Vec<Link> = Vec::new();
        let mut malformed = None;
        assert_eq!(
            collect(&mut objects, &mut malformed, &fixtures::link_loopback()),
            Control::Continue
        );
        assert_eq!(collect(&mut objects, &mut malformed, &[0; 6]), Control::Stop);
        assert_eq!(objects.len(), 1);

        let err = settle_dump(objects, malformed, RequestState::Done, "links").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_dump_kernel_error() {
        let err = settle_dump::<Link>(Vec::new(), None, RequestState::Failed(-libc::EPERM), "links")
            .unwrap_err();
        assert_eq!(err.errno(), Some(libc::EPERM));
        assert!(err.to_string().starts_with("dumping links:"));

        let links = vec![Link::from_bytes(&fixtures::link_loopback()).unwrap()];
        assert_eq!(settle_dump(links, None, RequestState::Done, "links").unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_notification_aborts_datagram() {
        let mut manager = CacheManager::new(SocketConfig::default()).unwrap();

        let mut data = message(NlMsgType::RTM_NEWLINK, 0, &fixtures::link_loopback());
        data.extend(message(NlMsgType::RTM_NEWLINK, 0, &[0; 6]));
        data.extend(message(NlMsgType::RTM_NEWLINK, 0, &fixtures::link_eth0(0x1043)));

        let mut events = Vec::new();
        let err = manager
            .apply_datagram(&data, |event| events.push(event))
            .unwrap_err();
        assert!(err.is_malformed());

        // Only what preceded the bad message was applied.
        assert_eq!(events.len(), 1);
        assert!(manager.caches().links.get(&1).is_some());
        assert!(manager.caches().links.get(&2).is_none());
    }

    #[test]
    fn test_apply_datagram_reports_changes() {
        let mut manager = CacheManager::new(SocketConfig::default()).unwrap();
        manager.caches_mut().fill(snapshot());

        let mut data = message(NlMsgType::RTM_NEWLINK, 0, &fixtures::link_eth0(0x1002));
        data.extend(message(NlMsgType::RTM_DELADDR, 0, &fixtures::addr_v4([192, 168, 1, 20], 24)));

        let mut actions = Vec::new();
        let state = manager
            .apply_datagram(&data, |event| actions.push(event.action()))
            .unwrap();
        assert!(state.is_pending());
        assert_eq!(actions, [Action::Change, Action::Del]);
        assert!(manager.caches().addrs.is_empty());
    }
}
