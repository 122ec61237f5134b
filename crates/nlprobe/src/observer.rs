//! The observer interface and the records handed to it.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::netlink::ObserverError;

/// Result returned by observer methods. `Err` becomes a listener fault.
pub type ObserverResult = std::result::Result<(), ObserverError>;

/// Receives decoded kernel events.
///
/// Every method defaults to ignoring the event, so an observer only
/// implements what it cares about. Returning `Err` stops delivery for the
/// current call; the error is handed back to whoever called `start` or
/// `data_ready`.
pub trait Observer {
    fn wlan_event(&mut self, event: &WlanEvent) -> ObserverResult {
        let _ = event;
        Ok(())
    }

    fn link_change(&mut self, action: Action, link: &LinkRecord) -> ObserverResult {
        let _ = (action, link);
        Ok(())
    }

    fn addr_change(&mut self, action: Action, addr: &AddrRecord) -> ObserverResult {
        let _ = (action, addr);
        Ok(())
    }

    fn route_change(&mut self, action: Action, route: &RouteRecord) -> ObserverResult {
        let _ = (action, route);
        Ok(())
    }
}

impl<T: Observer + ?Sized> Observer for &mut T {
    fn wlan_event(&mut self, event: &WlanEvent) -> ObserverResult {
        (**self).wlan_event(event)
    }

    fn link_change(&mut self, action: Action, link: &LinkRecord) -> ObserverResult {
        (**self).link_change(action, link)
    }

    fn addr_change(&mut self, action: Action, addr: &AddrRecord) -> ObserverResult {
        (**self).addr_change(action, addr)
    }

    fn route_change(&mut self, action: Action, route: &RouteRecord) -> ObserverResult {
        (**self).route_change(action, route)
    }
}

impl<T: Observer + ?Sized> Observer for Box<T> {
    fn wlan_event(&mut self, event: &WlanEvent) -> ObserverResult {
        (**self).wlan_event(event)
    }

    fn link_change(&mut self, action: Action, link: &LinkRecord) -> ObserverResult {
        (**self).link_change(action, link)
    }

    fn addr_change(&mut self, action: Action, addr: &AddrRecord) -> ObserverResult {
        (**self).addr_change(action, addr)
    }

    fn route_change(&mut self, action: Action, route: &RouteRecord) -> ObserverResult {
        (**self).route_change(action, route)
    }
}

/// Cache action attached to routing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Unspec,
    New,
    Del,
    Get,
    Set,
    Change,
    Unknown(u8),
}

impl Action {
    /// Decode the libnl-style action code.
    pub fn from_raw(code: u8) -> Self {
        match code {
            0 => Self::Unspec,
            1 => Self::New,
            2 => Self::Del,
            3 => Self::Get,
            4 => Self::Set,
            5 => Self::Change,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspec => "UNSPEC",
            Self::New => "NEW",
            Self::Del => "DEL",
            Self::Get => "GET",
            Self::Set => "SET",
            Self::Change => "CHANGE",
            Self::Unknown(_) => "???",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl Serialize for Action {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Association state of a scanned BSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum BssStatus {
    #[cfg_attr(feature = "serde", serde(rename = "Authenticated"))]
    Authenticated,
    #[cfg_attr(feature = "serde", serde(rename = "Connected"))]
    Connected,
    #[cfg_attr(feature = "serde", serde(rename = "Joined"))]
    Joined,
    #[cfg_attr(feature = "serde", serde(rename = "no status"))]
    NoStatus,
}

impl BssStatus {
    /// Decode `NL80211_BSS_STATUS`. Unknown values read as no status.
    pub fn from_raw(status: u32) -> Self {
        match status {
            0 => Self::Authenticated,
            1 => Self::Connected,
            2 => Self::Joined,
            _ => Self::NoStatus,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authenticated => "Authenticated",
            Self::Connected => "Connected",
            Self::Joined => "Joined",
            Self::NoStatus => "no status",
        }
    }
}

impl std::fmt::Display for BssStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One BSS from a scan dump.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScannedSsid {
    /// SSID bytes exactly as advertised; not necessarily UTF-8.
    pub ssid: Vec<u8>,
    pub status: BssStatus,
}

/// An nl80211 event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct WlanEvent {
    /// Command name without the `NL80211_CMD_` prefix.
    pub cmd: &'static str,
    /// Interface index, -1 when the event carries none.
    pub ifindex: i32,
    /// Scan results attached to scan, association and new-interface events.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub ssids: Option<Vec<ScannedSsid>>,
}

/// Link fields reported on link changes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LinkRecord {
    pub ifindex: i32,
    pub flags: u32,
    pub arptype: u16,
    pub family: u8,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
}

/// Address fields reported on address changes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AddrRecord {
    pub ifindex: i32,
    pub flags: u32,
    pub family: u8,
    pub scope: u8,
    /// Local address as `addr/prefixlen`, or the bare address for a full-length prefix.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub local: Option<String>,
}

/// Route fields reported on route changes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RouteRecord {
    pub family: u8,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub route_type: u8,
    pub table: u32,
    /// Destination prefix, `"default"` when there is none.
    pub dst: String,
    /// Output interface of the first next hop, -1 when there is none.
    pub ifindex: i32,
}
