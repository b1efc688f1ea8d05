//! # Session Authentication State
//!
//! Immutable per-session snapshot. Every change produces a new value through
//! `with_signature` or `with_authenticated_identity`; the session registry
//! installs it with a compare-and-swap. Readers holding an `Arc` to an older
//! snapshot keep seeing a consistent view.

use super::entities::{AuthenticationOutcome, ServerSignature};
use super::header::AuthParams;
use hdl_types::{CredentialType, IdentityRef};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached mutual-authentication signature and the cnonce it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutualAuthentication {
    pub client_nonce: Vec<u8>,
    pub signature: ServerSignature,
}

/// What the session remembers about its last successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub identity: IdentityRef,
    pub credential_type: CredentialType,
    /// Verbatim `Authorization` header that produced the outcome.
    pub authorization: Option<String>,
    pub outcome: AuthenticationOutcome,
}

#[derive(Debug, Clone)]
pub struct SessionAuthState {
    session_id: String,
    server_nonce: Vec<u8>,
    created_at: Instant,
    mutual: Option<MutualAuthentication>,
    authenticated: Option<AuthenticatedSession>,
}

impl SessionAuthState {
    /// Fresh state with a random server nonce of `nonce_length` bytes.
    pub fn new(session_id: impl Into<String>, nonce_length: usize) -> Self {
        let mut nonce = vec![0u8; nonce_length];
        OsRng.fill_bytes(&mut nonce);
        Self::with_server_nonce(session_id, nonce)
    }

    pub fn with_server_nonce(session_id: impl Into<String>, server_nonce: Vec<u8>) -> Self {
        Self {
            session_id: session_id.into(),
            server_nonce,
            created_at: Instant::now(),
            mutual: None,
            authenticated: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn server_nonce(&self) -> &[u8] {
        &self.server_nonce
    }

    pub fn mutual(&self) -> Option<&MutualAuthentication> {
        self.mutual.as_ref()
    }

    pub fn authenticated(&self) -> Option<&AuthenticatedSession> {
        self.authenticated.as_ref()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// False when the header names a different session.
    pub fn validate_against_header(&self, params: &AuthParams) -> bool {
        match params.session_id() {
            Some(claimed) => claimed == self.session_id,
            None => true,
        }
    }

    /// The same authenticated identity under a new session id and nonce.
    ///
    /// The cached header and mutual signature were bound to the old nonce and
    /// are dropped.
    pub fn rotated(&self, session_id: impl Into<String>, nonce_length: usize) -> Self {
        let authenticated = self.authenticated.clone().map(|auth| AuthenticatedSession {
            authorization: None,
            ..auth
        });
        Self {
            authenticated,
            ..Self::new(session_id, nonce_length)
        }
    }

    /// New snapshot carrying a mutual-authentication signature.
    pub fn with_signature(&self, client_nonce: Vec<u8>, signature: ServerSignature) -> Self {
        Self {
            mutual: Some(MutualAuthentication {
                client_nonce,
                signature,
            }),
            ..self.clone()
        }
    }

    /// New snapshot recording a successful authentication.
    pub fn with_authenticated_identity(
        &self,
        outcome: AuthenticationOutcome,
        authorization: Option<String>,
    ) -> Self {
        let authenticated = match (&outcome.identity, outcome.credential_type) {
            (Some(identity), Some(credential_type)) if outcome.succeeded => {
                Some(AuthenticatedSession {
                    identity: identity.clone(),
                    credential_type,
                    authorization,
                    outcome: AuthenticationOutcome {
                        server_signature: None,
                        ..outcome
                    },
                })
            }
            // never downgrade
            _ => self.authenticated.clone(),
        };
        Self {
            authenticated,
            ..self.clone()
        }
    }

    /// Outcome cached for a byte-identical `Authorization` header.
    pub fn recall_if_unchanged(&self, authorization: &str) -> Option<AuthenticationOutcome> {
        let cached = self.authenticated.as_ref()?;
        match cached.authorization.as_deref() {
            Some(previous) if previous == authorization => Some(cached.outcome.clone()),
            _ => None,
        }
    }
}

/// Return the signature cached for `client_nonce`, or compute one over
/// `server_nonce || client_nonce` and return it with a new snapshot.
///
/// When the signature is reused the returned `Arc` is `state` itself, so a
/// caller can tell whether anything needs installing.
pub fn compute_or_reuse_mutual_signature<F, E>(
    state: &Arc<SessionAuthState>,
    client_nonce: &[u8],
    sign: F,
) -> Result<(ServerSignature, Arc<SessionAuthState>), E>
where
    F: FnOnce(&[u8]) -> Result<ServerSignature, E>,
{
    if let Some(mutual) = &state.mutual {
        if mutual.client_nonce == client_nonce {
            return Ok((mutual.signature.clone(), Arc::clone(state)));
        }
    }
    let message = [state.server_nonce.as_slice(), client_nonce].concat();
    let signature = sign(&message)?;
    let next = state.with_signature(client_nonce.to_vec(), signature.clone());
    Ok((signature, Arc::new(next)))
}
