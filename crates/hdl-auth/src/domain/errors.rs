//! # Authentication Errors
//!
//! Error taxonomy for identity verification.
//!
//! Every variant is handled inside the orchestrator and surfaced to callers as
//! a coarse diagnostic string. Variant payloads are for logs only; they never
//! reach the `WWW-Authenticate` header.

use hdl_types::CredentialType;
use thiserror::Error;

/// Errors that can occur while authenticating a caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Algorithm name, wire code or credential type is not in the registry.
    #[error("Unsupported algorithm: {0}")]
    AlgorithmUnsupported(String),

    /// Signed response bytes do not match their layout.
    #[error("Malformed signed response: {0}")]
    MalformedResponse(String),

    /// Handle not found, resolution not certified, or the authority was unreachable.
    #[error("Identity unresolvable: {0}")]
    IdentityUnresolvable(String),

    /// Resolution succeeded but returned no public key to try.
    #[error("No public key found for {0}")]
    NoPublicKeyFound(String),

    /// No candidate credential validated the response.
    #[error("Authentication failed for {0} credential")]
    AuthenticationFailed(CredentialType),

    /// Header claims a session other than the one carrying the request.
    #[error("Session mismatch")]
    BadSession,

    /// Header is authenticating but is missing required fields.
    #[error("Incomplete authentication: {0}")]
    IncompleteAuthentication(String),

    /// An Authorization header arrived over a transport that is not secure.
    #[error("Insecure transport")]
    InsecureTransport,
}

impl AuthError {
    /// The diagnostic string shown to the caller.
    pub fn diagnostic(&self) -> &'static str {
        match self {
            AuthError::AlgorithmUnsupported(_) => "unsupported algorithm",
            AuthError::MalformedResponse(_) => "malformed signed response",
            AuthError::IdentityUnresolvable(_) => "identity not resolvable",
            AuthError::NoPublicKeyFound(_) => "no public key found",
            AuthError::AuthenticationFailed(CredentialType::PublicKey) => "signature failed",
            AuthError::AuthenticationFailed(CredentialType::SecretKey) => "identity not verified",
            AuthError::BadSession => "bad session",
            AuthError::IncompleteAuthentication(_) => "incomplete authentication",
            AuthError::InsecureTransport => "insecure transport",
        }
    }
}
