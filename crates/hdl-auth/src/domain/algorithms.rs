//! # Algorithm Registry
//!
//! Classifies the hash, MAC and key-derivation algorithms a client may name.
//!
//! The registry is a fixed table built once on first use. Lookups are
//! case-insensitive and ignore punctuation, so `sha-256`, `SHA256` and
//! `Sha_256` all resolve to the same descriptor. The registry never performs
//! cryptography itself.

use super::errors::AuthError;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Closed set of supported algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmId {
    Md5,
    Sha1,
    Sha256,
    HmacSha1,
    HmacSha256,
    Pbkdf2HmacSha1,
}

/// How an algorithm turns a secret into a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmFamily {
    /// Plain hash; usable for secret keys and as a signature hash.
    Digest,
    /// Keyed MAC; secret keys only.
    Hmac,
    /// Derived key followed by HMAC; secret keys only.
    Pbkdf2,
}

/// Registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    pub id: AlgorithmId,
    /// Identifier embedded in a public-key signed response.
    pub canonical: &'static str,
    /// Code byte leading a secret-key signed response.
    pub wire_code: u8,
    /// Spellings a client may send.
    pub aliases: &'static [&'static str],
}

const DESCRIPTORS: [AlgorithmDescriptor; 6] = [
    AlgorithmDescriptor {
        id: AlgorithmId::Md5,
        canonical: "MD5",
        wire_code: 0x01,
        aliases: &["MD5"],
    },
    AlgorithmDescriptor {
        id: AlgorithmId::Sha1,
        canonical: "SHA1",
        wire_code: 0x02,
        aliases: &["SHA", "SHA1", "SHA-1"],
    },
    AlgorithmDescriptor {
        id: AlgorithmId::Sha256,
        canonical: "SHA-256",
        wire_code: 0x03,
        aliases: &["SHA-256", "SHA256", "SHA-2", "SHA2"],
    },
    AlgorithmDescriptor {
        id: AlgorithmId::HmacSha1,
        canonical: "HMAC-SHA1",
        wire_code: 0x12,
        aliases: &["HMAC-SHA1", "HmacSHA1"],
    },
    AlgorithmDescriptor {
        id: AlgorithmId::HmacSha256,
        canonical: "HMAC-SHA256",
        wire_code: 0x13,
        aliases: &["HMAC-SHA256", "HmacSHA256"],
    },
    AlgorithmDescriptor {
        id: AlgorithmId::Pbkdf2HmacSha1,
        canonical: "PBKDF2-HMAC-SHA1",
        wire_code: 0x22,
        aliases: &["PBKDF2-HMAC-SHA1", "PBKDF2WithHmacSHA1"],
    },
];

impl AlgorithmId {
    pub fn descriptor(&self) -> &'static AlgorithmDescriptor {
        // DESCRIPTORS covers every variant
        match self {
            AlgorithmId::Md5 => &DESCRIPTORS[0],
            AlgorithmId::Sha1 => &DESCRIPTORS[1],
            AlgorithmId::Sha256 => &DESCRIPTORS[2],
            AlgorithmId::HmacSha1 => &DESCRIPTORS[3],
            AlgorithmId::HmacSha256 => &DESCRIPTORS[4],
            AlgorithmId::Pbkdf2HmacSha1 => &DESCRIPTORS[5],
        }
    }

    pub fn family(&self) -> AlgorithmFamily {
        match self {
            AlgorithmId::Md5 | AlgorithmId::Sha1 | AlgorithmId::Sha256 => AlgorithmFamily::Digest,
            AlgorithmId::HmacSha1 | AlgorithmId::HmacSha256 => AlgorithmFamily::Hmac,
            AlgorithmId::Pbkdf2HmacSha1 => AlgorithmFamily::Pbkdf2,
        }
    }

    pub fn canonical(&self) -> &'static str {
        self.descriptor().canonical
    }

    pub fn wire_code(&self) -> u8 {
        self.descriptor().wire_code
    }

    /// Usable as the hash of a public-key signature.
    pub fn is_signature_hash(&self) -> bool {
        self.family() == AlgorithmFamily::Digest
    }

    /// Resolve through the process-wide registry.
    pub fn resolve(name: &str) -> Result<Self, AuthError> {
        ALGORITHMS.resolve(name).map(|d| d.id)
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Alias lookup table.
#[derive(Debug)]
pub struct AlgorithmRegistry {
    by_alias: HashMap<String, AlgorithmId>,
    by_code: HashMap<u8, AlgorithmId>,
}

impl AlgorithmRegistry {
    fn build() -> Self {
        let mut by_alias = HashMap::new();
        let mut by_code = HashMap::new();
        for d in &DESCRIPTORS {
            by_alias.insert(normalize(d.canonical), d.id);
            for alias in d.aliases {
                by_alias.insert(normalize(alias), d.id);
            }
            by_code.insert(d.wire_code, d.id);
        }
        Self { by_alias, by_code }
    }

    /// Look up a client-supplied name or alias.
    pub fn resolve(&self, name: &str) -> Result<&'static AlgorithmDescriptor, AuthError> {
        self.by_alias
            .get(&normalize(name))
            .map(|id| id.descriptor())
            .ok_or_else(|| AuthError::AlgorithmUnsupported(name.to_string()))
    }

    /// Look up the code byte of a secret-key response.
    pub fn by_wire_code(&self, code: u8) -> Result<&'static AlgorithmDescriptor, AuthError> {
        self.by_code
            .get(&code)
            .map(|id| id.descriptor())
            .ok_or_else(|| AuthError::AlgorithmUnsupported(format!("wire code 0x{code:02x}")))
    }
}

/// Process-wide registry, read-only after first use.
pub static ALGORITHMS: LazyLock<AlgorithmRegistry> = LazyLock::new(AlgorithmRegistry::build);

/// Uppercase ASCII alphanumerics only.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
