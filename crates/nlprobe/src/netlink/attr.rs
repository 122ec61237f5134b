//! Netlink attribute (nlattr/rtattr) handling.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4;

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type, possibly carrying flag bits.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    ///
    /// The caller checks that `data_len` fits the 16-bit length.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if this is a nested attribute.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Read a header from the front of `data`. No alignment is required.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(attr, _)| attr)
            .map_err(|_| Error::Truncated {
                expected: NLA_HDRLEN,
                actual: data.len(),
            })
    }
}

/// Iterator over netlink attributes in a buffer.
///
/// Stops silently at the first attribute whose header does not fit.
/// Use [`AttrTable::parse`] when framing violations must be reported.
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute type, payload data).
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (attr, payload, rest) = split_attr(self.data).ok()??;
        self.data = rest;
        Some((attr.kind(), payload))
    }
}

/// Split the first attribute off `data`.
///
/// `Ok(None)` when fewer than a header's worth of bytes remain.
fn split_attr(data: &[u8]) -> Result<Option<(NlAttr, &[u8], &[u8])>> {
    if data.len() < NLA_HDRLEN {
        return Ok(None);
    }

    let attr = NlAttr::from_bytes(data)?;
    let len = attr.nla_len as usize;
    if len < NLA_HDRLEN {
        return Err(Error::InvalidMessage(format!(
            "attribute {} claims length {}",
            attr.kind(),
            len
        )));
    }
    if len > data.len() {
        return Err(Error::Truncated {
            expected: len,
            actual: data.len(),
        });
    }

    let payload = &data[NLA_HDRLEN..len];
    let rest = data.get(nla_align(len)..).unwrap_or(&[]);
    Ok(Some((attr, payload, rest)))
}

/// Attributes of one message indexed by type.
///
/// Types above `max_type` are ignored so newer kernels can add attributes
/// without breaking the parse. When a type repeats, the last one wins.
#[derive(Debug, Clone)]
pub struct AttrTable<'a> {
    slots: Vec<Option<&'a [u8]>>,
}

impl<'a> AttrTable<'a> {
    /// Index the attributes in `data`.
    pub fn parse(data: &'a [u8], max_type: u16) -> Result<Self> {
        let mut slots = vec![None; max_type as usize + 1];
        let mut rest = data;
        while let Some((attr, payload, next)) = split_attr(rest)? {
            if let Some(slot) = slots.get_mut(attr.kind() as usize) {
                *slot = Some(payload);
            }
            rest = next;
        }
        Ok(Self { slots })
    }

    /// Look up an attribute payload.
    pub fn get(&self, attr: u16) -> Option<&'a [u8]> {
        self.slots.get(attr as usize).copied().flatten()
    }

    /// Check whether an attribute is present.
    pub fn has(&self, attr: u16) -> bool {
        self.get(attr).is_some()
    }

    fn require(&self, attr: u16) -> Result<&'a [u8]> {
        self.get(attr).ok_or(Error::MissingAttribute { attr })
    }

    pub fn u8(&self, attr: u16) -> Result<u8> {
        get::u8(self.require(attr)?)
    }

    pub fn u16(&self, attr: u16) -> Result<u16> {
        get::u16_ne(self.require(attr)?)
    }

    pub fn u32(&self, attr: u16) -> Result<u32> {
        get::u32_ne(self.require(attr)?)
    }

    /// Raw payload of a required attribute.
    pub fn bytes(&self, attr: u16) -> Result<&'a [u8]> {
        self.require(attr)
    }

    /// String payload with trailing NUL padding removed, not validated as UTF-8.
    pub fn str_bytes(&self, attr: u16) -> Result<&'a [u8]> {
        Ok(get::str_bytes(self.require(attr)?))
    }

    pub fn string(&self, attr: u16) -> Result<&'a str> {
        get::string(self.require(attr)?)
    }

    /// Parse a nested attribute's payload as its own table.
    pub fn nested(&self, attr: u16, max_type: u16) -> Result<AttrTable<'a>> {
        AttrTable::parse(self.require(attr)?, max_type)
    }
}

/// Helper functions for extracting typed values from attribute payloads.
pub mod get {
    use super::*;

    /// Extract a u8 value.
    pub fn u8(data: &[u8]) -> Result<u8> {
        data.first()
            .copied()
            .ok_or_else(|| Error::InvalidAttribute("empty u8 attribute".into()))
    }

    /// Extract a u16 value (native endian).
    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        match data {
            [a, b, ..] => Ok(u16::from_ne_bytes([*a, *b])),
            _ => Err(Error::InvalidAttribute("truncated u16 attribute".into())),
        }
    }

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        match data {
            [a, b, c, d, ..] => Ok(u32::from_ne_bytes([*a, *b, *c, *d])),
            _ => Err(Error::InvalidAttribute("truncated u32 attribute".into())),
        }
    }

    /// Extract an i32 value (native endian).
    pub fn i32_ne(data: &[u8]) -> Result<i32> {
        u32_ne(data).map(|v| v as i32)
    }

    /// Strip trailing NUL padding from a string payload.
    ///
    /// Interior NUL bytes are kept: SSIDs and similar payloads are opaque.
    pub fn str_bytes(data: &[u8]) -> &[u8] {
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        &data[..end]
    }

    /// Extract a string, length-delimited rather than NUL-scanned.
    pub fn string(data: &[u8]) -> Result<&str> {
        std::str::from_utf8(str_bytes(data))
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }
}
