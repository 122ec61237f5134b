//! The routing change listener.

use std::os::unix::io::{AsRawFd, RawFd};

use tracing::debug;

use super::cache::ObjectCache;
use super::manager::{CacheEvent, CacheManager};
use super::objects::{Address, Link, Route};
use super::types::IfInfoMsg;
use crate::dispatch::{Dispatcher, EventSource};
use crate::netlink::request::{self, Control};
use crate::netlink::{
    Error, MessageBuilder, NetlinkSocket, NlMsgType, Protocol, RequestState, Result, SocketConfig,
};
use crate::observer::Observer;

/// Build the `RTM_SETLINK` request that sets or clears `flags` on a cached link.
///
/// `ifi_flags` carries the link's new flags and `ifi_change` the bits being
/// touched, so other flags are left alone.
pub fn link_flags_request(
    links: &ObjectCache<Link>,
    ifindex: i32,
    flags: u32,
    set: bool,
) -> Result<MessageBuilder> {
    let link = links.get(&ifindex).ok_or(Error::LinkNotFound { ifindex })?;
    let new_flags = if set {
        link.flags() | flags
    } else {
        link.flags() & !flags
    };

    let mut builder = MessageBuilder::request(NlMsgType::RTM_SETLINK);
    builder.append(
        &IfInfoMsg::new()
            .with_index(ifindex)
            .with_flags(new_flags)
            .with_change(flags),
    );
    Ok(builder)
}

/// Mirrors links, addresses and routes and reports every change.
///
/// The event socket is allocated by [`new`](Self::new) and connected by
/// [`start`](Self::start), which also replays the initial cache contents.
#[derive(Debug)]
pub struct RouteListener<O> {
    dispatcher: Dispatcher<O>,
    manager: CacheManager,
    started: bool,
}

impl<O: Observer> RouteListener<O> {
    pub fn new(observer: O) -> Result<Self> {
        Self::with_config(observer, SocketConfig::default())
    }

    pub fn with_config(observer: O, config: SocketConfig) -> Result<Self> {
        Ok(Self {
            dispatcher: Dispatcher::new(observer),
            manager: CacheManager::new(config)?,
            started: false,
        })
    }

    /// Subscribe, fill the caches, and report every cached object as new.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::InvalidState("route listener already started"));
        }
        self.manager.connect()?;
        self.manager.refill()?;
        self.started = true;
        self.replay()
    }

    /// Report every cached object as new, stopping at the first fault.
    fn replay(&mut self) -> Result<()> {
        for event in self.manager.caches().replay() {
            if self.dispatcher.deliver(|o| event.deliver(o)) == Control::Stop {
                break;
            }
        }
        self.dispatcher.settle(Ok(RequestState::Done))
    }

    /// Run `pass` over the caches, delivering each change it reports.
    ///
    /// Changes are applied to the caches even while a fault is pending;
    /// only delivery to the observer stops.
    fn dispatch_with<F>(&mut self, pass: F) -> Result<()>
    where
        F: FnOnce(&mut CacheManager, &mut dyn FnMut(CacheEvent)) -> Result<RequestState>,
    {
        let dispatcher = &mut self.dispatcher;
        let outcome = pass(&mut self.manager, &mut |event| {
            dispatcher.deliver(|o| event.deliver(o));
        });
        self.dispatcher.settle(outcome)
    }

    /// Set `flags` (IFF_*) on a link.
    pub fn set_link_flags(&self, ifindex: i32, flags: u32) -> Result<()> {
        self.change_link_flags(ifindex, flags, true)
    }

    /// Clear `flags` (IFF_*) on a link.
    pub fn unset_link_flags(&self, ifindex: i32, flags: u32) -> Result<()> {
        self.change_link_flags(ifindex, flags, false)
    }

    fn change_link_flags(&self, ifindex: i32, flags: u32, set: bool) -> Result<()> {
        let builder = link_flags_request(&self.manager.caches().links, ifindex, flags, set)?;
        let socket = NetlinkSocket::connected(Protocol::Route, self.manager.config())?;
        request::request_ack(&socket, builder)
            .map_err(|e| e.with_context("changing link flags"))?;
        debug!(ifindex, flags, set, "link flags changed");
        Ok(())
    }

    pub fn link(&self, ifindex: i32) -> Option<&Link> {
        self.manager.caches().links.get(&ifindex)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.manager.caches().links.iter()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.manager.caches().addrs.iter()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.manager.caches().routes.iter()
    }

    pub fn is_started(&self) -> bool {
        self.started
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

impl<O> AsRawFd for RouteListener<O> {
    fn as_raw_fd(&self) -> RawFd {
        self.manager.socket().as_raw_fd()
    }
}

impl<O: Observer> EventSource for RouteListener<O> {
    fn data_ready(&mut self) -> Result<()> {
        if !self.started {
            return Err(Error::InvalidState("route listener not started"));
        }
        self.dispatch_with(|manager, on_event| manager.drain(on_event))
    }
}
