//! Observer that prints events as text or JSON lines.

use std::io::{self, Write};

use nlprobe::{
    Action, AddrRecord, LinkRecord, Observer, ObserverResult, RouteRecord, ScannedSsid, WlanEvent,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Prints every event to stdout.
///
/// A write failure (closed pipe) is returned to the listener as an observer
/// error, which ends the monitor.
#[derive(Debug)]
pub struct Printer {
    format: Format,
    quiet: bool,
    scanned: Vec<i32>,
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<Action>,
    #[serde(flatten)]
    record: &'a T,
}

impl Printer {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            quiet: false,
            scanned: Vec::new(),
        }
    }

    /// Track scan completion without printing events.
    pub fn quiet(format: Format) -> Self {
        Self {
            quiet: true,
            ..Self::new(format)
        }
    }

    /// Whether a scan on `ifindex` finished or was aborted.
    pub fn scan_finished(&self, ifindex: i32) -> bool {
        self.scanned.contains(&ifindex)
    }

    fn emit<T: Serialize>(
        &self,
        kind: &'static str,
        action: Option<Action>,
        record: &T,
        text: impl FnOnce() -> String,
    ) -> ObserverResult {
        if self.quiet {
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut stdout, &Tagged { kind, action, record })?;
                writeln!(stdout)?;
            }
            Format::Text => writeln!(stdout, "{}", text())?,
        }
        Ok(())
    }
}

fn ssid_list(ssids: &[ScannedSsid]) -> String {
    ssids
        .iter()
        .map(|s| format!("\"{}\" ({})", String::from_utf8_lossy(&s.ssid), s.status))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Observer for Printer {
    fn wlan_event(&mut self, event: &WlanEvent) -> ObserverResult {
        if matches!(event.cmd, "NEW_SCAN_RESULTS" | "SCAN_ABORTED") {
            self.scanned.push(event.ifindex);
        }
        self.emit("wlan", None, event, || match &event.ssids {
            Some(ssids) => format!("wlan {} ifindex {}: {}", event.cmd, event.ifindex, ssid_list(ssids)),
            None => format!("wlan {} ifindex {}", event.cmd, event.ifindex),
        })
    }

    fn link_change(&mut self, action: Action, link: &LinkRecord) -> ObserverResult {
        self.emit("link", Some(action), link, || {
            format!(
                "link {} {}: {} flags {:#x} type {}",
                action,
                link.ifindex,
                link.name.as_deref().unwrap_or("?"),
                link.flags,
                link.arptype
            )
        })
    }

    fn addr_change(&mut self, action: Action, addr: &AddrRecord) -> ObserverResult {
        self.emit("addr", Some(action), addr, || {
            format!(
                "addr {} ifindex {}: {} scope {} flags {:#x}",
                action,
                addr.ifindex,
                addr.local.as_deref().unwrap_or("?"),
                addr.scope,
                addr.flags
            )
        })
    }

    fn route_change(&mut self, action: Action, route: &RouteRecord) -> ObserverResult {
        self.emit("route", Some(action), route, || {
            format!(
                "route {} {} table {} ifindex {} type {}",
                action, route.dst, route.table, route.ifindex, route.route_type
            )
        })
    }
}

/// Print scan results gathered after a scan.
pub fn print_scan(results: &[ScannedSsid], format: Format) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        Format::Json => {
            serde_json::to_writer(&mut stdout, results)?;
            writeln!(stdout)?;
        }
        Format::Text => {
            for result in results {
                writeln!(
                    stdout,
                    "{}\t{}",
                    String::from_utf8_lossy(&result.ssid),
                    result.status
                )?;
            }
        }
    }
    Ok(())
}
