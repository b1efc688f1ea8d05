//! Local Key Source
//!
//! Used when this process is the authoritative server for the claimed
//! handle: credentials are read straight from storage and secret-key MACs
//! are recomputed in place.

use crate::domain::algorithms::AlgorithmFamily;
use crate::domain::entities::SecretKeyChallenge;
use crate::domain::errors::AuthError;
use crate::domain::mac;
use crate::ports::outbound::{HandleStore, KeySource};
use async_trait::async_trait;
use hdl_types::{HandleValue, IdentityRef, HS_PUBKEY, HS_SECKEY};
use std::sync::Arc;
use tracing::debug;

pub struct LocalKeySource<S: HandleStore> {
    store: Arc<S>,
    max_pbkdf2_iterations: u32,
}

impl<S: HandleStore> LocalKeySource<S> {
    pub fn new(store: Arc<S>, max_pbkdf2_iterations: u32) -> Self {
        Self {
            store,
            max_pbkdf2_iterations,
        }
    }

    /// Values of `value_type` for `identity`, ascending by index.
    fn candidates(
        &self,
        identity: &IdentityRef,
        value_type: &str,
    ) -> Result<Vec<HandleValue>, AuthError> {
        let mut values: Vec<HandleValue> = self
            .store
            .values(&identity.handle)?
            .into_iter()
            .filter(|v| v.has_type(value_type))
            .filter(|v| !identity.has_index() || v.index == identity.index)
            .collect();
        values.sort_by_key(|v| v.index);
        Ok(values)
    }
}

#[async_trait]
impl<S: HandleStore> KeySource for LocalKeySource<S> {
    async fn resolve_candidate_keys(
        &self,
        identity: &IdentityRef,
    ) -> Result<Vec<HandleValue>, AuthError> {
        self.candidates(identity, HS_PUBKEY)
    }

    async fn verify_secret(&self, challenge: &SecretKeyChallenge) -> Result<Option<u32>, AuthError> {
        let pbkdf2 = challenge.algorithm.family() == AlgorithmFamily::Pbkdf2;
        // one derivation per request at most
        if pbkdf2 && !challenge.identity.has_index() {
            return Err(AuthError::IncompleteAuthentication(
                "PBKDF2 response without a secret key index".into(),
            ));
        }

        let secrets = self.candidates(&challenge.identity, HS_SECKEY)?;
        debug!(
            handle = %challenge.identity.handle,
            candidates = secrets.len(),
            "Checking secret key locally"
        );

        if !pbkdf2 {
            return match_secret(challenge, &secrets, self.max_pbkdf2_iterations);
        }
        let challenge = challenge.clone();
        let max_iterations = self.max_pbkdf2_iterations;
        tokio::task::spawn_blocking(move || match_secret(&challenge, &secrets, max_iterations))
            .await
            .map_err(|e| AuthError::MalformedResponse(format!("key derivation aborted: {e}")))?
    }
}

/// Index of the first secret that reproduces the payload.
fn match_secret(
    challenge: &SecretKeyChallenge,
    secrets: &[HandleValue],
    max_iterations: u32,
) -> Result<Option<u32>, AuthError> {
    for secret in secrets {
        let matched = mac::verify_payload(
            challenge.algorithm,
            &secret.data,
            &challenge.server_nonce,
            &challenge.client_nonce,
            &challenge.payload,
            max_iterations,
        )?;
        if matched {
            return Ok(Some(secret.index));
        }
    }
    Ok(None)
}
