//! # Signed Response Layouts
//!
//! The binary blob a credential holder returns for a nonce pair.
//!
//! ```text
//! SecretKey: [1-byte algorithm code][payload]
//! PublicKey: [u32 len][algorithm id][u32 len][signature]
//! ```
//!
//! For PBKDF2 the secret-key payload is itself an envelope:
//! `[u32 len][salt][u32 iterations][u32 length-bits][u32 len][mac]`.

use super::algorithms::{AlgorithmFamily, AlgorithmId, ALGORITHMS};
use super::errors::AuthError;
use hdl_types::{ByteReader, ByteWriter, CredentialType, DecodeError};

impl From<DecodeError> for AuthError {
    fn from(err: DecodeError) -> Self {
        AuthError::MalformedResponse(err.to_string())
    }
}

/// Key-derivation parameters for PBKDF2 responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    pub salt: Vec<u8>,
    pub iterations: u32,
    /// Derived key length in bits.
    pub length_bits: u32,
}

impl Pbkdf2Params {
    pub const DEFAULT_ITERATIONS: u32 = 10_000;
    pub const DEFAULT_LENGTH_BITS: u32 = 160;
    pub const MAX_LENGTH_BITS: u32 = 1024;

    pub fn new(salt: impl Into<Vec<u8>>, iterations: u32, length_bits: u32) -> Self {
        Self {
            salt: salt.into(),
            iterations,
            length_bits,
        }
    }

    /// Check bounds before doing any derivation work.
    pub fn validate(&self, max_iterations: u32) -> Result<(), AuthError> {
        if self.iterations == 0 || self.iterations > max_iterations {
            return Err(AuthError::MalformedResponse(format!(
                "iterations {} outside 1..={max_iterations}",
                self.iterations
            )));
        }
        if self.length_bits == 0
            || self.length_bits % 8 != 0
            || self.length_bits > Self::MAX_LENGTH_BITS
        {
            return Err(AuthError::MalformedResponse(format!(
                "derived key length {} bits",
                self.length_bits
            )));
        }
        Ok(())
    }

    pub fn length_bytes(&self) -> usize {
        (self.length_bits / 8) as usize
    }
}

/// PBKDF2 parameters travelling with the MAC they produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Envelope {
    pub params: Pbkdf2Params,
    pub mac: Vec<u8>,
}

impl Pbkdf2Envelope {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(16 + self.params.salt.len() + self.mac.len());
        w.put_bytes(&self.params.salt)
            .put_u32(self.params.iterations)
            .put_u32(self.params.length_bits)
            .put_bytes(&self.mac);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, AuthError> {
        let mut r = ByteReader::new(bytes);
        let salt = r.get_bytes()?.to_vec();
        let iterations = r.get_u32()?;
        let length_bits = r.get_u32()?;
        let mac = r.get_bytes()?.to_vec();
        r.finish()?;
        Ok(Self {
            params: Pbkdf2Params::new(salt, iterations, length_bits),
            mac,
        })
    }
}

/// Decoded signed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedResponse {
    SecretKey {
        algorithm: AlgorithmId,
        /// Raw MAC, or a [`Pbkdf2Envelope`] for PBKDF2.
        payload: Vec<u8>,
    },
    PublicKey {
        /// Hash the signature was computed with.
        algorithm: AlgorithmId,
        signature: Vec<u8>,
    },
}

impl SignedResponse {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            SignedResponse::SecretKey { .. } => CredentialType::SecretKey,
            SignedResponse::PublicKey { .. } => CredentialType::PublicKey,
        }
    }

    pub fn algorithm(&self) -> AlgorithmId {
        match self {
            SignedResponse::SecretKey { algorithm, .. }
            | SignedResponse::PublicKey { algorithm, .. } => *algorithm,
        }
    }

    /// Build from the pieces carried by an Authorization header.
    ///
    /// `raw` is the bare MAC or signature. PBKDF2 MACs are wrapped in their
    /// envelope here, which is why the parameters are needed.
    pub fn from_parts(
        credential_type: CredentialType,
        algorithm: AlgorithmId,
        raw: Vec<u8>,
        pbkdf2: Option<Pbkdf2Params>,
    ) -> Result<Self, AuthError> {
        match credential_type {
            CredentialType::SecretKey => {
                let payload = match (algorithm.family(), pbkdf2) {
                    (AlgorithmFamily::Pbkdf2, Some(params)) => {
                        Pbkdf2Envelope { params, mac: raw }.encode()
                    }
                    (AlgorithmFamily::Pbkdf2, None) => {
                        return Err(AuthError::IncompleteAuthentication(
                            "PBKDF2 response without salt, iterations and length".into(),
                        ))
                    }
                    _ => raw,
                };
                Ok(SignedResponse::SecretKey { algorithm, payload })
            }
            CredentialType::PublicKey => {
                if !algorithm.is_signature_hash() {
                    return Err(AuthError::AlgorithmUnsupported(format!(
                        "{algorithm} with {credential_type}"
                    )));
                }
                Ok(SignedResponse::PublicKey {
                    algorithm,
                    signature: raw,
                })
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            SignedResponse::SecretKey { algorithm, payload } => {
                let mut w = ByteWriter::with_capacity(1 + payload.len());
                w.put_u8(algorithm.wire_code()).put_raw(payload);
                w.into_bytes()
            }
            SignedResponse::PublicKey {
                algorithm,
                signature,
            } => {
                let mut w = ByteWriter::new();
                w.put_bytes(algorithm.canonical().as_bytes())
                    .put_bytes(signature);
                w.into_bytes()
            }
        }
    }

    pub fn decode(credential_type: CredentialType, bytes: &[u8]) -> Result<Self, AuthError> {
        let mut r = ByteReader::new(bytes);
        match credential_type {
            CredentialType::SecretKey => {
                let algorithm = ALGORITHMS.by_wire_code(r.get_u8()?)?.id;
                let payload = r.rest().to_vec();
                if payload.is_empty() {
                    return Err(AuthError::MalformedResponse("empty MAC".into()));
                }
                Ok(SignedResponse::SecretKey { algorithm, payload })
            }
            CredentialType::PublicKey => {
                let alg_bytes = r.get_bytes()?;
                let signature = r.get_bytes()?.to_vec();
                r.finish()?;
                let name = std::str::from_utf8(alg_bytes)
                    .map_err(|_| AuthError::MalformedResponse("algorithm id is not text".into()))?;
                let algorithm = ALGORITHMS.resolve(name)?.id;
                if !algorithm.is_signature_hash() {
                    return Err(AuthError::AlgorithmUnsupported(format!(
                        "{algorithm} with {credential_type}"
                    )));
                }
                Ok(SignedResponse::PublicKey {
                    algorithm,
                    signature,
                })
            }
        }
    }
}
