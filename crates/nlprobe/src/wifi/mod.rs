//! nl80211 scan and association events.

mod ie;
mod listener;
mod nl80211;
mod scan;

pub use ie::{IeIter, find_ie, ssid};
pub use listener::{Nl80211Groups, WlanListener, decode_event, handle_event, trigger_scan_request};
pub use nl80211::*;
pub use scan::{BssCollector, BssFilter, Nl80211Scanner, ScanSource, bss_from_scan_message, parse_bss};
