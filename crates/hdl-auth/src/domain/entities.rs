//! Domain entities for authentication requests and results.

use super::algorithms::AlgorithmId;
use super::errors::AuthError;
use super::signed_response::SignedResponse;
use hdl_types::{CredentialType, IdentityRef};
use serde::{Deserialize, Serialize};

/// Mutual-authentication material: the server's signature over the nonce pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSignature {
    /// Algorithm name as advertised in `serverAlg`
    pub algorithm: String,
    pub bytes: Vec<u8>,
}

/// Everything the verifier needs for one attempt.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    /// Claimed identity; index 0 means try every candidate.
    pub identity: IdentityRef,
    pub response: SignedResponse,
    pub server_nonce: Vec<u8>,
    pub client_nonce: Vec<u8>,
}

impl VerificationRequest {
    pub fn credential_type(&self) -> CredentialType {
        self.response.credential_type()
    }

    /// `server_nonce || client_nonce`, the bytes that were signed.
    pub fn signed_bytes(&self) -> Vec<u8> {
        [self.server_nonce.as_slice(), self.client_nonce.as_slice()].concat()
    }
}

/// A secret-key response handed to a [`KeySource`](crate::ports::KeySource).
#[derive(Debug, Clone)]
pub struct SecretKeyChallenge {
    pub identity: IdentityRef,
    pub algorithm: AlgorithmId,
    pub server_nonce: Vec<u8>,
    pub client_nonce: Vec<u8>,
    /// Bytes following the algorithm code in the signed response.
    pub payload: Vec<u8>,
}

/// Result of one pass through the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationOutcome {
    /// An identity was claimed in this request.
    pub attempted: bool,
    pub succeeded: bool,
    /// Authenticated identity, with the index that actually verified.
    pub identity: Option<IdentityRef>,
    pub credential_type: Option<CredentialType>,
    /// Every failure, in the order it happened.
    pub errors: Vec<AuthError>,
    /// Present when mutual authentication was requested and available.
    pub server_signature: Option<ServerSignature>,
}

impl AuthenticationOutcome {
    pub fn not_attempted() -> Self {
        Self::default()
    }

    pub fn success(identity: IdentityRef, credential_type: CredentialType) -> Self {
        Self {
            attempted: true,
            succeeded: true,
            identity: Some(identity),
            credential_type: Some(credential_type),
            ..Default::default()
        }
    }

    pub fn failure(errors: Vec<AuthError>) -> Self {
        Self {
            attempted: true,
            succeeded: false,
            errors,
            ..Default::default()
        }
    }

    /// A session authenticated earlier, with nothing claimed in this request.
    pub fn continuation(identity: IdentityRef, credential_type: CredentialType) -> Self {
        Self {
            attempted: false,
            succeeded: true,
            identity: Some(identity),
            credential_type: Some(credential_type),
            ..Default::default()
        }
    }

    pub fn with_server_signature(mut self, signature: Option<ServerSignature>) -> Self {
        self.server_signature = signature;
        self
    }

    /// Attempted and not (yet) successful.
    pub fn is_failure(&self) -> bool {
        self.attempted && !self.succeeded
    }

    /// Diagnostic strings, one per error.
    pub fn diagnostics(&self) -> Vec<&'static str> {
        self.errors.iter().map(AuthError::diagnostic).collect()
    }
}
