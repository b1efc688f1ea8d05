//! # Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators this subsystem consumes: the resolution service, the remote
//! verification service, local handle storage and the server's own signing key.
//! `KeySource` is the capability the identity verifier is written against; the
//! local and delegated adapters implement it on top of the other ports.

use crate::domain::entities::SecretKeyChallenge;
use crate::domain::errors::AuthError;
use crate::domain::keys::{KeyDecodeError, PublicKeyMaterial};
use hdl_types::{type_matches, HandleValue, IdentityRef};
use thiserror::Error;

/// Error from resolution or remote verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// Handle does not exist
    #[error("Handle not found: {0}")]
    NotFound(String),

    /// Response was not signed by the authoritative server
    #[error("Resolution response not certified")]
    NotCertified,

    /// No answer within the transport timeout
    #[error("Request timed out")]
    Timeout,

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Authoritative server answered with something unusable
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Request cannot be expressed against this backend
    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl From<ResolutionError> for AuthError {
    fn from(err: ResolutionError) -> Self {
        AuthError::IdentityUnresolvable(err.to_string())
    }
}

/// A resolution request.
///
/// With both filters empty every value is returned. With both set, a value is
/// returned when it matches either filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionQuery {
    pub handle: String,
    /// Type families, e.g. `HS_PUBKEY` also matches `HS_PUBKEY.rsa`
    pub types: Vec<String>,
    pub indices: Vec<u32>,
    /// Ask the authoritative server to sign the response
    pub certify: bool,
}

impl ResolutionQuery {
    pub fn by_type(handle: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            types: vec![value_type.into()],
            indices: Vec::new(),
            certify: false,
        }
    }

    pub fn by_index(handle: impl Into<String>, index: u32) -> Self {
        Self {
            handle: handle.into(),
            types: Vec::new(),
            indices: vec![index],
            certify: false,
        }
    }

    pub fn certified(mut self) -> Self {
        self.certify = true;
        self
    }

    pub fn matches(&self, value: &HandleValue) -> bool {
        if self.types.is_empty() && self.indices.is_empty() {
            return true;
        }
        self.indices.contains(&value.index)
            || self.types.iter().any(|t| type_matches(t, &value.value_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResponse {
    pub values: Vec<HandleValue>,
    /// Response carried a valid signature from the authoritative server
    pub certified: bool,
}

/// Handle resolution service.
#[async_trait::async_trait]
pub trait HandleResolver: Send + Sync {
    async fn resolve(&self, query: &ResolutionQuery) -> Result<ResolutionResponse, ResolutionError>;
}

/// Arguments of a remote `verifyAuth` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVerifyRequest {
    pub handle: String,
    pub index: u32,
    pub server_nonce: Vec<u8>,
    pub client_nonce: Vec<u8>,
    /// Wire code of the MAC algorithm
    pub hash_type: u8,
    /// MAC payload, including the PBKDF2 envelope where applicable
    pub mac: Vec<u8>,
}

/// Remote verification service run by the authoritative server.
#[async_trait::async_trait]
pub trait RemoteVerifier: Send + Sync {
    /// `Ok(false)` means the authoritative server checked and the MAC did not match.
    async fn verify_auth(&self, request: &RemoteVerifyRequest) -> Result<bool, ResolutionError>;
}

/// Direct read access to handle records held by this server.
pub trait HandleStore: Send + Sync {
    fn values(&self, handle: &str) -> Result<Vec<HandleValue>, ResolutionError>;
}

/// Error from the server's signing key.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Signing failed: {0}")]
    Failed(String),
}

/// The server's own key, used for mutual authentication.
pub trait ServerSigner: Send + Sync {
    /// Name sent as `serverAlg`
    fn algorithm(&self) -> &str;

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;

    /// Key clients verify `serverSignature` against
    fn public_key(&self) -> PublicKeyMaterial;
}

/// Where credentials come from.
///
/// The identity verifier is written once against this trait; local and
/// delegated backends are chosen at construction.
#[async_trait::async_trait]
pub trait KeySource: Send + Sync {
    /// Public-key values for `identity`.
    ///
    /// With an index, only that value (if it is a public key). Without, every
    /// `HS_PUBKEY` value on the handle.
    async fn resolve_candidate_keys(
        &self,
        identity: &IdentityRef,
    ) -> Result<Vec<HandleValue>, AuthError>;

    /// Check a secret-key response.
    ///
    /// Returns the index whose secret matched, or `None` if none did.
    async fn verify_secret(&self, challenge: &SecretKeyChallenge) -> Result<Option<u32>, AuthError>;

    /// Key held in a candidate value. Called once per candidate tried.
    fn decode_public_key(&self, value: &HandleValue) -> Result<PublicKeyMaterial, KeyDecodeError> {
        PublicKeyMaterial::decode(&value.data)
    }
}
