//! Netlink client for nl80211 scan events and rtnetlink state mirroring.
//!
//! Two listeners sit on top of a small synchronous netlink client:
//!
//! - [`WlanListener`] resolves the `nl80211` generic netlink family,
//!   follows its `mlme` and `scan` multicast groups, triggers scans and
//!   reports scan results and association events.
//! - [`RouteListener`] mirrors the kernel's links, addresses and routes
//!   and reports every change. It can also set and clear link flags.
//!
//! Both report to an [`Observer`]. Neither waits on its own: the owner
//! polls [`EventSource::fileno`] and calls [`EventSource::data_ready`], or
//! hands the listener to [`AsyncListener`] (feature `tokio`, on by default).
//!
//! # Features
//!
//! - `tokio` - `AsyncListener` driver on the tokio reactor (default)
//! - `serde` - `Serialize` for the observer records
//! - `integration` - tests against the live kernel
//!
//! # Example
//!
//! ```ignore
//! use nlprobe::{Action, LinkRecord, Observer, ObserverResult, RouteListener};
//!
//! struct Print;
//!
//! impl Observer for Print {
//!     fn link_change(&mut self, action: Action, link: &LinkRecord) -> ObserverResult {
//!         println!("{action} {:?}", link.name);
//!         Ok(())
//!     }
//! }
//!
//! let mut listener = RouteListener::new(Print)?;
//! listener.start()?;
//! ```

pub mod dispatch;
#[cfg(feature = "tokio")]
pub mod driver;
pub mod netlink;
pub mod observer;
pub mod route;
pub mod wifi;

pub use dispatch::{Dispatcher, EventSource};
#[cfg(feature = "tokio")]
pub use driver::AsyncListener;
pub use netlink::{Error, ObserverError, RequestState, Result, SocketConfig};
pub use observer::{
    Action, AddrRecord, BssStatus, LinkRecord, Observer, ObserverResult, RouteRecord,
    ScannedSsid, WlanEvent,
};
pub use route::RouteListener;
pub use wifi::{BssFilter, WlanListener};
