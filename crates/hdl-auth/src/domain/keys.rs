//! # Public Key Records
//!
//! Decodes `HS_PUBKEY` value data and verifies signatures against it.
//!
//! ## Layout
//!
//! ```text
//! [u32 len][key type][u16 flags][family fields...]
//! ```
//!
//! | Key type | Fields (each length-prefixed) |
//! |---|---|
//! | `RSA_PUB_KEY` | exponent, modulus |
//! | `DSA_PUB_KEY` | q, p, g, y |
//! | `Ed25519_PUB_KEY` | 32-byte point |
//! | `SECP256K1_PUB_KEY` | SEC1 point |
//!
//! The signature scheme is derived from the key family together with the
//! hash named in the signed response. Combinations that make no sense for a
//! family yield no scheme, and that candidate simply cannot verify.

use super::algorithms::AlgorithmId;
use super::mac::hash;
use hdl_types::{ByteReader, ByteWriter, DecodeError};
use md5::Md5;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;
use signature::hazmat::PrehashVerifier;
use thiserror::Error;

pub const RSA_KEY_TYPE: &str = "RSA_PUB_KEY";
pub const DSA_KEY_TYPE: &str = "DSA_PUB_KEY";
pub const ED25519_KEY_TYPE: &str = "Ed25519_PUB_KEY";
pub const SECP256K1_KEY_TYPE: &str = "SECP256K1_PUB_KEY";

/// Errors decoding a public key record.
#[derive(Debug, Error)]
pub enum KeyDecodeError {
    #[error("truncated key record: {0}")]
    Layout(#[from] DecodeError),

    #[error("unknown key type: {0}")]
    UnknownType(String),

    #[error("invalid {family} key: {reason}")]
    Invalid { family: KeyFamily, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Dsa,
    Ed25519,
    Secp256k1,
}

impl std::fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::Dsa => "DSA",
            KeyFamily::Ed25519 => "Ed25519",
            KeyFamily::Secp256k1 => "secp256k1",
        })
    }
}

/// Signature algorithm implied by (hash, key family).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// RSASSA-PKCS1-v1_5 over the digest.
    RsaPkcs1(AlgorithmId),
    /// DSA, DER-encoded (r, s).
    Dsa(AlgorithmId),
    /// ECDSA on secp256k1, DER or fixed 64-byte (r || s).
    EcdsaSecp256k1(AlgorithmId),
    /// Pure Ed25519 over the message itself.
    Ed25519,
}

impl SignatureScheme {
    pub fn derive(hash: AlgorithmId, family: KeyFamily) -> Option<Self> {
        use AlgorithmId::{Md5, Sha1, Sha256};
        match (family, hash) {
            (KeyFamily::Rsa, Md5 | Sha1 | Sha256) => Some(SignatureScheme::RsaPkcs1(hash)),
            (KeyFamily::Dsa, Sha1 | Sha256) => Some(SignatureScheme::Dsa(hash)),
            (KeyFamily::Secp256k1, Sha1 | Sha256) => Some(SignatureScheme::EcdsaSecp256k1(hash)),
            (KeyFamily::Ed25519, _) => Some(SignatureScheme::Ed25519),
            _ => None,
        }
    }
}

/// A decoded public key.
#[derive(Debug, Clone)]
pub enum PublicKeyMaterial {
    Rsa(RsaPublicKey),
    Dsa(dsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKeyMaterial {
    pub fn family(&self) -> KeyFamily {
        match self {
            PublicKeyMaterial::Rsa(_) => KeyFamily::Rsa,
            PublicKeyMaterial::Dsa(_) => KeyFamily::Dsa,
            PublicKeyMaterial::Ed25519(_) => KeyFamily::Ed25519,
            PublicKeyMaterial::Secp256k1(_) => KeyFamily::Secp256k1,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, KeyDecodeError> {
        let mut r = ByteReader::new(bytes);
        let key_type = String::from_utf8_lossy(r.get_bytes()?).into_owned();
        let _flags = r.get_u16()?;

        let key = match key_type.as_str() {
            RSA_KEY_TYPE => {
                let e = BigUint::from_bytes_be(r.get_bytes()?);
                let n = BigUint::from_bytes_be(r.get_bytes()?);
                RsaPublicKey::new(n, e)
                    .map(PublicKeyMaterial::Rsa)
                    .map_err(|e| invalid(KeyFamily::Rsa, e))?
            }
            DSA_KEY_TYPE => {
                let q = dsa::BigUint::from_bytes_be(r.get_bytes()?);
                let p = dsa::BigUint::from_bytes_be(r.get_bytes()?);
                let g = dsa::BigUint::from_bytes_be(r.get_bytes()?);
                let y = dsa::BigUint::from_bytes_be(r.get_bytes()?);
                let components = dsa::Components::from_components(p, q, g)
                    .map_err(|e| invalid(KeyFamily::Dsa, e))?;
                dsa::VerifyingKey::from_components(components, y)
                    .map(PublicKeyMaterial::Dsa)
                    .map_err(|e| invalid(KeyFamily::Dsa, e))?
            }
            ED25519_KEY_TYPE => {
                let point: [u8; 32] = r
                    .get_bytes()?
                    .try_into()
                    .map_err(|_| invalid(KeyFamily::Ed25519, "point is not 32 bytes"))?;
                ed25519_dalek::VerifyingKey::from_bytes(&point)
                    .map(PublicKeyMaterial::Ed25519)
                    .map_err(|e| invalid(KeyFamily::Ed25519, e))?
            }
            SECP256K1_KEY_TYPE => k256::ecdsa::VerifyingKey::from_sec1_bytes(r.get_bytes()?)
                .map(PublicKeyMaterial::Secp256k1)
                .map_err(|e| invalid(KeyFamily::Secp256k1, e))?,
            other => return Err(KeyDecodeError::UnknownType(other.to_string())),
        };
        r.finish()?;
        Ok(key)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        match self {
            PublicKeyMaterial::Rsa(key) => {
                use rsa::traits::PublicKeyParts;
                w.put_bytes(RSA_KEY_TYPE.as_bytes())
                    .put_u16(0)
                    .put_bytes(&key.e().to_bytes_be())
                    .put_bytes(&key.n().to_bytes_be());
            }
            PublicKeyMaterial::Dsa(key) => {
                let c = key.components();
                w.put_bytes(DSA_KEY_TYPE.as_bytes())
                    .put_u16(0)
                    .put_bytes(&c.q().to_bytes_be())
                    .put_bytes(&c.p().to_bytes_be())
                    .put_bytes(&c.g().to_bytes_be())
                    .put_bytes(&key.y().to_bytes_be());
            }
            PublicKeyMaterial::Ed25519(key) => {
                w.put_bytes(ED25519_KEY_TYPE.as_bytes())
                    .put_u16(0)
                    .put_bytes(key.as_bytes());
            }
            PublicKeyMaterial::Secp256k1(key) => {
                w.put_bytes(SECP256K1_KEY_TYPE.as_bytes())
                    .put_u16(0)
                    .put_bytes(key.to_encoded_point(true).as_bytes());
            }
        }
        w.into_bytes()
    }

    /// Verify `signature` over `message` using the scheme implied by `hash`.
    ///
    /// Returns `false` for a mismatch, an unparseable signature, or a hash the
    /// key family cannot use.
    pub fn verify(&self, hash_alg: AlgorithmId, message: &[u8], signature: &[u8]) -> bool {
        let Some(scheme) = SignatureScheme::derive(hash_alg, self.family()) else {
            return false;
        };
        match (self, scheme) {
            (PublicKeyMaterial::Rsa(key), SignatureScheme::RsaPkcs1(h)) => {
                let Ok(digest) = hash(h, &[message]) else {
                    return false;
                };
                let padding = match h {
                    AlgorithmId::Md5 => Pkcs1v15Sign::new::<Md5>(),
                    AlgorithmId::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
                    _ => Pkcs1v15Sign::new::<Sha256>(),
                };
                key.verify(padding, &digest, signature).is_ok()
            }
            (PublicKeyMaterial::Dsa(key), SignatureScheme::Dsa(h)) => {
                let (Ok(digest), Ok(sig)) = (hash(h, &[message]), dsa::Signature::try_from(signature))
                else {
                    return false;
                };
                key.verify_prehash(&digest, &sig).is_ok()
            }
            (PublicKeyMaterial::Secp256k1(key), SignatureScheme::EcdsaSecp256k1(h)) => {
                let Ok(digest) = hash(h, &[message]) else {
                    return false;
                };
                let sig = k256::ecdsa::Signature::from_der(signature)
                    .or_else(|_| k256::ecdsa::Signature::from_slice(signature));
                match sig {
                    Ok(sig) => key.verify_prehash(&digest, &sig).is_ok(),
                    Err(_) => false,
                }
            }
            (PublicKeyMaterial::Ed25519(key), SignatureScheme::Ed25519) => {
                match ed25519_dalek::Signature::from_slice(signature) {
                    Ok(sig) => key.verify_strict(message, &sig).is_ok(),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }
}

fn invalid(family: KeyFamily, reason: impl ToString) -> KeyDecodeError {
    KeyDecodeError::Invalid {
        family,
        reason: reason.to_string(),
    }
}
