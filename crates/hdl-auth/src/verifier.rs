//! # Identity Verifier
//!
//! Decides whether a signed response proves possession of a credential and
//! which index it belongs to. Written once against [`KeySource`]; the local
//! and delegated backends only change where key material comes from.
//!
//! ## Public-key path
//!
//! 1. Resolve candidate keys (one index, or every `HS_PUBKEY` value).
//! 2. Sort ascending by index.
//! 3. Try each key against `server_nonce || client_nonce`; the first one that
//!    verifies is the authenticating index. Later keys are never tried.
//!
//! ## Secret-key path
//!
//! The key source recomputes the MAC with its copy of the secret and reports
//! which index matched.

use crate::domain::algorithms::AlgorithmId;
use crate::domain::entities::{SecretKeyChallenge, VerificationRequest};
use crate::domain::errors::AuthError;
use crate::domain::signed_response::SignedResponse;
use crate::ports::inbound::IdentityVerificationApi;
use crate::ports::outbound::KeySource;
use hdl_types::{CredentialType, IdentityRef};
use std::sync::Arc;
use tracing::debug;

pub struct IdentityVerifier<K: KeySource> {
    keys: Arc<K>,
}

impl<K: KeySource> IdentityVerifier<K> {
    pub fn new(keys: Arc<K>) -> Self {
        Self { keys }
    }

    pub fn key_source(&self) -> &Arc<K> {
        &self.keys
    }

    async fn verify_public_key(
        &self,
        request: &VerificationRequest,
        algorithm: AlgorithmId,
        signature: &[u8],
    ) -> Result<IdentityRef, AuthError> {
        let mut candidates = self.keys.resolve_candidate_keys(&request.identity).await?;
        if candidates.is_empty() {
            return Err(AuthError::NoPublicKeyFound(request.identity.to_string()));
        }
        candidates.sort_by_key(|c| c.index);

        let message = request.signed_bytes();
        for candidate in &candidates {
            let key = match self.keys.decode_public_key(candidate) {
                Ok(key) => key,
                Err(e) => {
                    debug!(index = candidate.index, error = %e, "Skipping undecodable public key");
                    continue;
                }
            };
            if key.verify(algorithm, &message, signature) {
                return Ok(request.identity.with_index(candidate.index));
            }
        }
        Err(AuthError::AuthenticationFailed(CredentialType::PublicKey))
    }

    async fn verify_secret_key(
        &self,
        request: &VerificationRequest,
        algorithm: AlgorithmId,
        payload: &[u8],
    ) -> Result<IdentityRef, AuthError> {
        let challenge = SecretKeyChallenge {
            identity: request.identity.clone(),
            algorithm,
            server_nonce: request.server_nonce.clone(),
            client_nonce: request.client_nonce.clone(),
            payload: payload.to_vec(),
        };
        match self.keys.verify_secret(&challenge).await? {
            Some(index) => Ok(request.identity.with_index(index)),
            None => Err(AuthError::AuthenticationFailed(CredentialType::SecretKey)),
        }
    }
}

#[async_trait::async_trait]
impl<K: KeySource> IdentityVerificationApi for IdentityVerifier<K> {
    async fn verify(&self, request: &VerificationRequest) -> Result<IdentityRef, AuthError> {
        match &request.response {
            SignedResponse::PublicKey {
                algorithm,
                signature,
            } => self.verify_public_key(request, *algorithm, signature).await,
            SignedResponse::SecretKey { algorithm, payload } => {
                self.verify_secret_key(request, *algorithm, payload).await
            }
        }
    }
}
