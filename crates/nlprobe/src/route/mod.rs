//! rtnetlink link, address and route mirroring.

pub mod cache;
#[cfg(test)]
mod fixtures;
mod listener;
mod manager;
mod objects;
pub mod types;

pub use cache::{CacheObject, ObjectCache};
pub use listener::{RouteListener, link_flags_request};
pub use manager::{CacheEvent, CacheManager, Caches, ROUTE_GROUPS, Snapshot};
pub use objects::{Address, Link, NextHop, Route, format_prefix};
