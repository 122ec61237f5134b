//! 802.11 information element scanning.

use super::nl80211::WLAN_EID_SSID;

/// Iterator over `(id, payload)` information elements.
///
/// Ends at the first element whose declared length runs past the buffer.
pub struct IeIter<'a> {
    data: &'a [u8],
}

impl<'a> IeIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for IeIter<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let [id, len, rest @ ..] = self.data else {
            return None;
        };
        let len = *len as usize;
        if len > rest.len() {
            self.data = &[];
            return None;
        }
        let (payload, next) = rest.split_at(len);
        self.data = next;
        Some((*id, payload))
    }
}

/// Payload of the first element with the given id.
pub fn find_ie(ies: &[u8], id: u8) -> Option<&[u8]> {
    IeIter::new(ies).find(|(eid, _)| *eid == id).map(|(_, payload)| payload)
}

/// SSID bytes, verbatim.
pub fn ssid(ies: &[u8]) -> Option<&[u8]> {
    find_ie(ies, WLAN_EID_SSID)
}
