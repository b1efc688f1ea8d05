//! # Inbound Ports (Driving Ports / API)
//!
//! Entry points used by the HTTP layer and administrative tools.

use crate::domain::entities::{AuthenticationOutcome, VerificationRequest};
use crate::domain::errors::AuthError;
use hdl_types::IdentityRef;

/// One inbound request, as seen by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationRequest {
    /// Session carrying the request, from the transport layer
    pub session_id: String,
    /// Raw `Authorization` header value, if any
    pub authorization: Option<String>,
    /// Request-level parameters (query string or form fields)
    pub request_params: Vec<(String, String)>,
}

impl AuthenticationRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_params.push((name.into(), value.into()));
        self
    }
}

/// What the orchestrator hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub outcome: AuthenticationOutcome,
    pub session_id: String,
    /// Server nonce of the session, for the `WWW-Authenticate` challenge
    pub server_nonce: Vec<u8>,
    /// Request touched session state, so a challenge should be returned
    pub requires_session: bool,
}

/// Per-request authentication.
#[async_trait::async_trait]
pub trait AuthenticationApi: Send + Sync {
    /// Never fails: every error is folded into the outcome.
    async fn authenticate(&self, request: AuthenticationRequest) -> AuthenticationResult;

    /// Whether `session_id` names a live session.
    fn has_session(&self, session_id: &str) -> bool;

    /// Move a session to `new_id` under a fresh server nonce and return that
    /// nonce. The old id stops naming anything.
    fn rotate_session(&self, session_id: &str, new_id: &str) -> Option<Vec<u8>>;
}

/// Core identity verification.
#[async_trait::async_trait]
pub trait IdentityVerificationApi: Send + Sync {
    /// Identity that actually authenticated, with its resolved index.
    async fn verify(&self, request: &VerificationRequest) -> Result<IdentityRef, AuthError>;
}
