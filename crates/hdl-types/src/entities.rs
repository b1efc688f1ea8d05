//! # Core Entities
//!
//! Identity references, handle values and credential types.

use crate::errors::IdentityParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value type tag of a shared-secret credential.
pub const HS_SECKEY: &str = "HS_SECKEY";

/// Value type tag of a public-key credential.
pub const HS_PUBKEY: &str = "HS_PUBKEY";

// =============================================================================
// IDENTITY REFERENCE
// =============================================================================

/// A handle plus the index of one of its values.
///
/// Index 0 means "unspecified": the verifier tries every candidate value of
/// the right type. There is no way to name an explicit index 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityRef {
    pub handle: String,
    pub index: u32,
}

impl IdentityRef {
    pub fn new(handle: impl Into<String>, index: u32) -> Self {
        Self {
            handle: handle.into(),
            index,
        }
    }

    /// Identity with an unspecified index.
    pub fn unindexed(handle: impl Into<String>) -> Self {
        Self::new(handle, 0)
    }

    pub fn has_index(&self) -> bool {
        self.index != 0
    }

    /// Same handle, resolved to `index`.
    pub fn with_index(&self, index: u32) -> Self {
        Self::new(self.handle.clone(), index)
    }

    /// Parse `index:handle` or a bare `handle`.
    ///
    /// An all-digit run before the first `:` is the index. Anything else is
    /// part of the handle, so `0.NA/1000` parses with index 0.
    pub fn parse(text: &str) -> Result<Self, IdentityParseError> {
        let (index, handle) = split_index_prefix(text)?;
        if handle.is_empty() {
            return Err(IdentityParseError::EmptyHandle);
        }
        Ok(Self::new(handle, index))
    }
}

/// Split a leading `digits:` prefix off `text`.
///
/// Returns index 0 and the untouched text when there is no such prefix.
pub fn split_index_prefix(text: &str) -> Result<(u32, &str), IdentityParseError> {
    if let Some((prefix, rest)) = text.split_once(':') {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            let index = prefix
                .parse::<u32>()
                .map_err(|_| IdentityParseError::IndexOutOfRange(prefix.to_string()))?;
            return Ok((index, rest));
        }
    }
    Ok((0, text))
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.handle)
        } else {
            write!(f, "{}:{}", self.index, self.handle)
        }
    }
}

// =============================================================================
// CREDENTIAL TYPE
// =============================================================================

/// The two credential families a handle value can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialType {
    SecretKey,
    PublicKey,
}

impl CredentialType {
    /// Canonical value type tag.
    pub const fn tag(&self) -> &'static str {
        match self {
            CredentialType::SecretKey => HS_SECKEY,
            CredentialType::PublicKey => HS_PUBKEY,
        }
    }

    /// Map a tag back to a credential type. Case-sensitive, like value types.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            HS_SECKEY => Some(CredentialType::SecretKey),
            HS_PUBKEY => Some(CredentialType::PublicKey),
            _ => None,
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// HANDLE VALUE
// =============================================================================

/// One typed value of a handle record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleValue {
    pub index: u32,
    pub value_type: String,
    pub data: Vec<u8>,
}

impl HandleValue {
    pub fn new(index: u32, value_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            value_type: value_type.into(),
            data: data.into(),
        }
    }

    /// Whether this value belongs to the `filter` type family.
    pub fn has_type(&self, filter: &str) -> bool {
        type_matches(filter, &self.value_type)
    }
}

/// Type-family match: `HS_PUBKEY` matches `HS_PUBKEY` and `HS_PUBKEY.<sub>`.
pub fn type_matches(filter: &str, value_type: &str) -> bool {
    match value_type.strip_prefix(filter) {
        Some("") => true,
        Some(sub) => sub.starts_with('.'),
        None => false,
    }
}
