//! Common test utilities for integration tests.
//!
//! The listeners work in the caller's network namespace, so tests that
//! change links create uniquely named dummy interfaces and remove them on
//! drop.

use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use nlprobe::{Action, AddrRecord, LinkRecord, Observer, ObserverResult, Result, RouteRecord};

static LINK_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate an interface name unique to this process (at most 15 bytes).
fn unique_link_name() -> String {
    let id = LINK_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("nlp{}x{}", std::process::id() % 100_000, id)
}

fn ip(args: &[&str]) -> Result<()> {
    let output = Command::new("ip").args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(nlprobe::Error::InvalidMessage(format!(
            "ip {:?} failed: {}",
            args, stderr
        )));
    }
    Ok(())
}

/// A dummy interface deleted when dropped.
pub struct DummyLink {
    name: String,
}

impl DummyLink {
    pub fn new() -> Result<Self> {
        let name = unique_link_name();
        ip(&["link", "add", &name, "type", "dummy"])?;
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ifindex(&self) -> Result<i32> {
        let path = format!("/sys/class/net/{}/ifindex", self.name);
        let content = std::fs::read_to_string(&path)?;
        content
            .trim()
            .parse()
            .map_err(|_| nlprobe::Error::InvalidMessage(format!("invalid ifindex for {}", self.name)))
    }

    #[allow(dead_code)]
    pub fn add_addr(&self, addr: &str) -> Result<()> {
        ip(&["addr", "add", addr, "dev", &self.name])
    }
}

impl Drop for DummyLink {
    fn drop(&mut self) {
        let _ = Command::new("ip")
            .args(["link", "del", &self.name])
            .status();
    }
}

/// Records every routing change.
#[derive(Debug, Default)]
pub struct Recorder {
    pub links: Vec<(Action, LinkRecord)>,
    pub addrs: Vec<(Action, AddrRecord)>,
    pub routes: Vec<(Action, RouteRecord)>,
}

impl Observer for Recorder {
    fn link_change(&mut self, action: Action, link: &LinkRecord) -> ObserverResult {
        self.links.push((action, link.clone()));
        Ok(())
    }

    fn addr_change(&mut self, action: Action, addr: &AddrRecord) -> ObserverResult {
        self.addrs.push((action, addr.clone()));
        Ok(())
    }

    fn route_change(&mut self, action: Action, route: &RouteRecord) -> ObserverResult {
        self.routes.push((action, route.clone()));
        Ok(())
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
///
/// Use this at the beginning of integration tests that require root privileges.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_link_name() {
        let name1 = unique_link_name();
        let name2 = unique_link_name();
        assert_ne!(name1, name2);
        assert!(name1.len() <= 15);
        assert!(name1.starts_with("nlp"));
    }
}
