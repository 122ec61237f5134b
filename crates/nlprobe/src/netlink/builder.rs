//! Message builder for constructing netlink messages.

use zerocopy::{Immutable, IntoBytes};

use super::attr::{NLA_F_NESTED, NLA_HDRLEN, NlAttr, nla_align};
use super::error::{Error, Result};
use super::genl::GenlMsgHdr;
use super::message::{NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Token returned when starting a nested attribute.
/// Used to finalize the nested attribute length.
#[derive(Debug, Clone, Copy)]
pub struct NestToken {
    /// Offset of the nested attribute header in the buffer.
    offset: usize,
    /// Attribute type, kept for overflow reporting.
    attr_type: u16,
}

/// Builder for constructing netlink messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Create a new message builder with the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        let header = NlMsgHdr::new(msg_type, flags);
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(header.as_bytes());
        Self { buf }
    }

    /// Request that expects an ACK.
    pub fn request(msg_type: u16) -> Self {
        Self::new(msg_type, NLM_F_REQUEST | NLM_F_ACK)
    }

    /// Dump request streaming every matching object.
    pub fn dump(msg_type: u16) -> Self {
        Self::new(msg_type, NLM_F_REQUEST | NLM_F_DUMP)
    }

    /// Generic netlink message for `family_id` carrying `cmd`.
    pub fn genl(family_id: u16, cmd: u8, version: u8, flags: u16) -> Self {
        let mut builder = Self::new(family_id, flags);
        builder.append(&GenlMsgHdr::new(cmd, version));
        builder
    }

    /// Get the current message length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the message is empty (header only).
    pub fn is_empty(&self) -> bool {
        self.buf.len() == NLMSG_HDRLEN
    }

    /// Append raw bytes to the message (with alignment padding).
    pub fn append_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.buf.resize(nlmsg_align(self.buf.len()), 0);
    }

    /// Append a fixed-size header struct to the message.
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) {
        self.append_bytes(data.as_bytes());
    }

    fn check_fits(&self, attr_type: u16, payload_len: usize) -> Result<()> {
        let attr_len = NLA_HDRLEN + payload_len;
        let msg_len = nla_align(self.buf.len() + attr_len);
        if attr_len > u16::MAX as usize || msg_len > u32::MAX as usize {
            return Err(Error::AttributeOverflow {
                attr: attr_type,
                len: payload_len,
            });
        }
        Ok(())
    }

    /// Append an attribute with the given type and data.
    pub fn put_raw(&mut self, attr_type: u16, data: &[u8]) -> Result<()> {
        self.check_fits(attr_type, data.len())?;
        let attr = NlAttr::new(attr_type, data.len());
        self.buf.extend_from_slice(attr.as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.resize(nla_align(self.buf.len()), 0);
        Ok(())
    }

    /// Append a u8 attribute.
    pub fn put_u8(&mut self, attr_type: u16, value: u8) -> Result<()> {
        self.put_raw(attr_type, &[value])
    }

    /// Append a u16 attribute (native endian).
    pub fn put_u16(&mut self, attr_type: u16, value: u16) -> Result<()> {
        self.put_raw(attr_type, &value.to_ne_bytes())
    }

    /// Append a u32 attribute (native endian).
    pub fn put_u32(&mut self, attr_type: u16, value: u32) -> Result<()> {
        self.put_raw(attr_type, &value.to_ne_bytes())
    }

    /// Append a NUL-terminated string attribute.
    pub fn put_string(&mut self, attr_type: u16, value: &str) -> Result<()> {
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        self.put_raw(attr_type, &data)
    }

    /// Embed the attributes of `child` as the payload of one nested attribute.
    ///
    /// Everything after the child's netlink header is copied, so a child
    /// built with [`MessageBuilder::new`] and filled with `put_*` calls turns
    /// into a list of nested attributes.
    pub fn put_nested(&mut self, attr_type: u16, child: &MessageBuilder) -> Result<()> {
        self.put_raw(attr_type | NLA_F_NESTED, &child.buf[NLMSG_HDRLEN..])
    }

    /// Start a nested attribute. Returns a token to finalize it.
    pub fn nest_start(&mut self, attr_type: u16) -> NestToken {
        let offset = self.buf.len();
        let attr = NlAttr::new(attr_type | NLA_F_NESTED, 0);
        self.buf.extend_from_slice(attr.as_bytes());
        NestToken { offset, attr_type }
    }

    /// End a nested attribute started with `nest_start`.
    pub fn nest_end(&mut self, token: NestToken) -> Result<()> {
        let len = self.buf.len() - token.offset;
        if len > u16::MAX as usize {
            return Err(Error::AttributeOverflow {
                attr: token.attr_type,
                len: len - NLA_HDRLEN,
            });
        }
        self.buf[token.offset..token.offset + 2].copy_from_slice(&(len as u16).to_ne_bytes());
        self.buf.resize(nla_align(self.buf.len()), 0);
        Ok(())
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    /// Set the port ID.
    pub fn set_pid(&mut self, pid: u32) {
        self.buf[12..16].copy_from_slice(&pid.to_ne_bytes());
    }

    /// Finalize and return the message bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let len = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&len.to_ne_bytes());
        self.buf
    }

    /// Get the current buffer for inspection.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
