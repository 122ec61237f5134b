//! winnow-based parsing of typed netlink payloads.
//!
//! Message types implement [`FromNetlink`]; the helpers here take care of
//! the fixed header every rtnetlink message starts with and hand the rest to
//! the attribute codec.

use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;
use zerocopy::FromBytes;

use super::attr::AttrTable;
use super::builder::MessageBuilder;
use super::error::{Error, Result};

/// Result type for winnow parsers.
pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

/// Trait for types that can be parsed from netlink wire format.
pub trait FromNetlink: Sized {
    /// Parse from a mutable byte slice reference.
    /// The slice is advanced past the consumed bytes.
    fn parse(input: &mut &[u8]) -> PResult<Self>;

    /// Parse from a complete message payload.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse
            .parse(data)
            .map_err(|e| Error::Parse(format!("{}", e)))
    }

    /// Append the fixed header a dump request for this type needs.
    fn write_dump_header(_builder: &mut MessageBuilder) {}
}

/// Unrecoverable parse failure.
pub fn cut() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

/// Parse a fixed-size header struct.
pub fn fixed<T: FromBytes>(input: &mut &[u8]) -> PResult<T> {
    let bytes: &[u8] = take(std::mem::size_of::<T>()).parse_next(input)?;
    T::read_from_bytes(bytes).map_err(|_| cut())
}

/// Index everything left in `input` as attributes.
pub fn attributes<'a>(input: &mut &'a [u8], max_type: u16) -> PResult<AttrTable<'a>> {
    let data = *input;
    *input = &data[data.len()..];
    AttrTable::parse(data, max_type).map_err(|_| cut())
}
