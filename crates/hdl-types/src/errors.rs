//! # Error Types
//!
//! Errors raised while parsing identities or decoding binary layouts.

use thiserror::Error;

/// Errors from the length-prefixed byte codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// A length prefix or fixed field runs past the end of the buffer.
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Bytes left over after the last expected field.
    #[error("Trailing bytes: {0} unread")]
    TrailingBytes(usize),
}

/// Errors from parsing an `index:handle` identity string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityParseError {
    /// Nothing left once the index prefix was removed.
    #[error("Identity has an empty handle")]
    EmptyHandle,

    /// The index prefix does not fit in an index.
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),
}
