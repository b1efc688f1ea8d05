//! # Authentication Service
//!
//! Application service implementing `AuthenticationApi`: the per-request
//! control flow around the identity verifier.
//!
//! ## Flow
//!
//! 1. Parse the `Authorization` header and merge request parameters.
//! 2. Load the session snapshot; a header naming another session fails with
//!    `BadSession` and nothing else happens.
//! 3. If an identity is claimed, reuse the cached outcome for a byte-identical
//!    header, otherwise verify the custom-header response and fall back to
//!    Basic credentials. Errors from both paths accumulate.
//! 4. On success install a snapshot recording the identity and header. A
//!    failure leaves the previously authenticated identity in place.
//! 5. With nothing claimed, a previously authenticated session continues.
//! 6. Independently, answer a mutual-authentication request (cnonce without
//!    id) with a signature over the nonce pair, reused while the cnonce is
//!    unchanged.
//!
//! No lock is held while verifying. The snapshot is read before and the
//! successor installed after, by compare-and-swap.

use crate::adapters::session_store::SessionRegistry;
use crate::domain::algorithms::{AlgorithmFamily, AlgorithmId};
use crate::domain::config::AuthConfig;
use crate::domain::credentials::generate_client_nonce;
use crate::domain::entities::{AuthenticationOutcome, ServerSignature, VerificationRequest};
use crate::domain::errors::AuthError;
use crate::domain::header::{self, AuthParams, BasicCredentials};
use crate::domain::mac;
use crate::domain::session::{compute_or_reuse_mutual_signature, SessionAuthState};
use crate::domain::signed_response::{Pbkdf2Params, SignedResponse};
use crate::ports::inbound::{
    AuthenticationApi, AuthenticationRequest, AuthenticationResult, IdentityVerificationApi,
};
use crate::ports::outbound::{KeySource, ServerSigner, SignerError};
use crate::verifier::IdentityVerifier;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hdl_types::{CredentialType, IdentityRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Algorithm used to check Basic passwords against stored secrets.
const BASIC_MAC_ALGORITHM: AlgorithmId = AlgorithmId::HmacSha256;

/// The authentication orchestrator.
pub struct AuthenticationService<K: KeySource> {
    verifier: IdentityVerifier<K>,
    sessions: Arc<SessionRegistry>,
    signer: Option<Arc<dyn ServerSigner>>,
    config: AuthConfig,
}

impl<K: KeySource> AuthenticationService<K> {
    pub fn new(keys: Arc<K>, sessions: Arc<SessionRegistry>, config: AuthConfig) -> Self {
        Self {
            verifier: IdentityVerifier::new(keys),
            sessions,
            signer: None,
            config,
        }
    }

    /// Enable mutual authentication with the server's own key.
    pub fn with_signer(mut self, signer: Arc<dyn ServerSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn signer(&self) -> Option<&Arc<dyn ServerSigner>> {
        self.signer.as_ref()
    }

    /// Server nonce of an existing session.
    pub fn session_nonce(&self, session_id: &str) -> Option<Vec<u8>> {
        self.sessions
            .get(session_id)
            .map(|s| s.server_nonce().to_vec())
    }

    /// Drop sessions idle for longer than the configured maximum age.
    pub fn purge_expired_sessions(&self) -> usize {
        let purged = self.sessions.purge_expired(self.config.session_max_age);
        if purged > 0 {
            info!(purged, "Purged expired authentication sessions");
        }
        purged
    }

    /// Purge idle sessions every `period` until the returned task is aborted.
    pub fn spawn_session_purge(self: &Arc<Self>, period: Duration) -> JoinHandle<()>
    where
        K: 'static,
    {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    debug!("Authentication service dropped, stopping session purge");
                    break;
                };
                service.purge_expired_sessions();
            }
        })
    }

    /// Verify a custom `Handle` header response against the session nonce.
    async fn verify_custom(
        &self,
        params: &AuthParams,
        state: &SessionAuthState,
    ) -> Result<(IdentityRef, CredentialType), AuthError> {
        if let Some(missing) = params.missing_required() {
            return Err(AuthError::IncompleteAuthentication(format!("missing {missing}")));
        }
        let id = params.id().unwrap_or_default();
        let tag = params.credential_type().unwrap_or_default();
        let alg = params.alg().unwrap_or_default();

        let credential_type = CredentialType::from_tag(tag)
            .ok_or_else(|| AuthError::AlgorithmUnsupported(format!("credential type {tag}")))?;
        let algorithm = AlgorithmId::resolve(alg)?;
        let identity =
            IdentityRef::parse(id).map_err(|e| AuthError::IdentityUnresolvable(e.to_string()))?;

        let client_nonce = decode_base64("cnonce", params.cnonce().unwrap_or_default())?;
        let signature = decode_base64("signature", params.signature().unwrap_or_default())?;
        let pbkdf2 = match algorithm.family() {
            AlgorithmFamily::Pbkdf2 => Some(self.pbkdf2_params(params)?),
            _ => None,
        };

        let request = VerificationRequest {
            identity,
            response: SignedResponse::from_parts(credential_type, algorithm, signature, pbkdf2)?,
            server_nonce: state.server_nonce().to_vec(),
            client_nonce,
        };
        let identity = self.verifier.verify(&request).await?;
        Ok((identity, credential_type))
    }

    fn pbkdf2_params(&self, params: &AuthParams) -> Result<Pbkdf2Params, AuthError> {
        let (Some(salt), Some(iterations), Some(length)) =
            (params.salt(), params.iterations(), params.length())
        else {
            return Err(AuthError::IncompleteAuthentication(
                "PBKDF2 needs salt, iterations and length".into(),
            ));
        };
        let parse = |name: &str, value: &str| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| AuthError::MalformedResponse(format!("{name} is not a number")))
        };
        let pbkdf2 = Pbkdf2Params::new(
            decode_base64("salt", salt)?,
            parse("iterations", iterations)?,
            parse("length", length)?,
        );
        pbkdf2.validate(self.config.max_pbkdf2_iterations)?;
        Ok(pbkdf2)
    }

    /// Check a Basic password through the secret-key path.
    ///
    /// The server plays the client: it picks a cnonce, MACs the nonce pair
    /// with the password, and asks the key source whether that matches.
    async fn verify_basic(
        &self,
        basic: &BasicCredentials,
        state: &SessionAuthState,
    ) -> Result<(IdentityRef, CredentialType), AuthError> {
        let client_nonce = generate_client_nonce();
        let payload = mac::respond(
            BASIC_MAC_ALGORITHM,
            &basic.password,
            state.server_nonce(),
            &client_nonce,
            None,
        )?;

        let request = VerificationRequest {
            identity: basic.identity.clone(),
            response: SignedResponse::SecretKey {
                algorithm: BASIC_MAC_ALGORITHM,
                payload,
            },
            server_nonce: state.server_nonce().to_vec(),
            client_nonce,
        };
        let identity = self.verifier.verify(&request).await?;
        Ok((identity, CredentialType::SecretKey))
    }

    /// Run every applicable verification path, collecting errors.
    async fn attempt(
        &self,
        params: &AuthParams,
        basic: Option<&BasicCredentials>,
        state: &SessionAuthState,
    ) -> AuthenticationOutcome {
        let mut errors = Vec::new();

        if params.is_authenticating() {
            match self.verify_custom(params, state).await {
                Ok((identity, credential_type)) => {
                    return AuthenticationOutcome::success(identity, credential_type)
                }
                Err(e) => {
                    debug!(error = %e, "Handle header authentication failed");
                    errors.push(e);
                }
            }
        }

        if let Some(basic) = basic {
            match self.verify_basic(basic, state).await {
                Ok((identity, credential_type)) => {
                    return AuthenticationOutcome {
                        errors,
                        ..AuthenticationOutcome::success(identity, credential_type)
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Basic authentication failed");
                    errors.push(e);
                }
            }
        }

        AuthenticationOutcome::failure(errors)
    }

    /// Attach a mutual-authentication signature when one was requested.
    fn mutual_signature(
        &self,
        session_id: &str,
        params: &AuthParams,
        state: Arc<SessionAuthState>,
    ) -> (Option<ServerSignature>, Arc<SessionAuthState>) {
        if !params.is_requesting_server_signature() || !self.config.server_signing {
            return (None, state);
        }
        let Some(signer) = &self.signer else {
            return (None, state);
        };
        let Ok(client_nonce) = decode_base64("cnonce", params.cnonce().unwrap_or_default()) else {
            debug!(session_id, "Ignoring server signature request with undecodable cnonce");
            return (None, state);
        };

        let sign = |message: &[u8]| -> Result<ServerSignature, SignerError> {
            Ok(ServerSignature {
                algorithm: signer.algorithm().to_string(),
                bytes: signer.sign(message)?,
            })
        };
        match compute_or_reuse_mutual_signature(&state, &client_nonce, sign) {
            Ok((signature, next)) => {
                if !Arc::ptr_eq(&state, &next) {
                    self.sessions.replace_if_current(session_id, &state, next.clone());
                }
                (Some(signature), next)
            }
            Err(e) => {
                warn!(session_id, error = %e, "Server signature unavailable");
                (None, state)
            }
        }
    }
}

#[async_trait::async_trait]
impl<K: KeySource> AuthenticationApi for AuthenticationService<K> {
    async fn authenticate(&self, request: AuthenticationRequest) -> AuthenticationResult {
        let session_id = request.session_id.as_str();
        let raw = request.authorization.as_deref();

        let is_handle_scheme = raw
            .and_then(|r| r.split_whitespace().next())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(header::SCHEME));
        let header_params = raw.and_then(header::parse);
        let unparseable = is_handle_scheme && header_params.is_none();
        let basic = match raw {
            Some(r) if self.config.allow_basic => header::parse_basic(r),
            _ => None,
        };

        let presented_header = header_params.is_some();
        let params = header::merge(
            header_params,
            request
                .request_params
                .iter()
                .map(|(n, v)| (n.as_str(), v.as_str())),
        );

        let requires_session =
            presented_header || unparseable || basic.is_some() || params.requires_session();
        let state = if requires_session {
            Some(self.sessions.load_or_create(session_id))
        } else {
            self.sessions.get(session_id)
        };

        let Some(mut state) = state else {
            return AuthenticationResult {
                outcome: AuthenticationOutcome::not_attempted(),
                session_id: request.session_id.clone(),
                server_nonce: Vec::new(),
                requires_session,
            };
        };

        if !state.validate_against_header(&params) {
            warn!(
                session_id,
                claimed = params.session_id().unwrap_or_default(),
                "Authorization names another session"
            );
            return AuthenticationResult {
                outcome: AuthenticationOutcome::failure(vec![AuthError::BadSession]),
                session_id: request.session_id.clone(),
                server_nonce: state.server_nonce().to_vec(),
                requires_session: true,
            };
        }

        let attempting = params.is_authenticating() || basic.is_some() || unparseable;
        let outcome = if unparseable {
            AuthenticationOutcome::failure(vec![AuthError::IncompleteAuthentication(
                "unparseable Handle authorization".into(),
            )])
        } else if attempting {
            match raw.and_then(|r| state.recall_if_unchanged(r)) {
                Some(cached) => {
                    debug!(session_id, "Authorization unchanged, reusing cached outcome");
                    cached
                }
                None => {
                    let outcome = self.attempt(&params, basic.as_ref(), &state).await;
                    if outcome.succeeded {
                        let next = Arc::new(
                            state.with_authenticated_identity(outcome.clone(), raw.map(String::from)),
                        );
                        self.sessions.replace_if_current(session_id, &state, next.clone());
                        state = next;
                    }
                    outcome
                }
            }
        } else {
            match state.authenticated() {
                Some(auth) => AuthenticationOutcome::continuation(
                    auth.identity.clone(),
                    auth.credential_type,
                ),
                None => AuthenticationOutcome::not_attempted(),
            }
        };

        if outcome.attempted {
            match (&outcome.identity, outcome.succeeded) {
                (Some(identity), true) => debug!(
                    session_id,
                    handle = %identity.handle,
                    index = identity.index,
                    "Authentication succeeded"
                ),
                _ => warn!(
                    session_id,
                    errors = %outcome.diagnostics().join("; "),
                    "Authentication failed"
                ),
            }
        }

        let (server_signature, state) = self.mutual_signature(session_id, &params, state);

        AuthenticationResult {
            outcome: outcome.with_server_signature(server_signature),
            session_id: request.session_id.clone(),
            server_nonce: state.server_nonce().to_vec(),
            requires_session,
        }
    }

    fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains(session_id)
    }

    fn rotate_session(&self, session_id: &str, new_id: &str) -> Option<Vec<u8>> {
        self.sessions
            .rotate(session_id, new_id)
            .map(|state| state.server_nonce().to_vec())
    }
}

fn decode_base64(name: &str, value: &str) -> Result<Vec<u8>, AuthError> {
    BASE64
        .decode(value.trim())
        .map_err(|_| AuthError::MalformedResponse(format!("{name} is not base64")))
}
