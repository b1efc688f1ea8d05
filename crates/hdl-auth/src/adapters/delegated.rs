//! Delegated Key Source
//!
//! Used when another server is authoritative for the claimed handle. Public
//! keys come from (certified) resolution; secret-key MACs are sent to the
//! authoritative server, which recomputes them with its copy of the secret.
//!
//! Every remote call is bounded by the configured timeout and never retried
//! here. A timeout surfaces as `IdentityUnresolvable`.

use crate::domain::entities::SecretKeyChallenge;
use crate::domain::errors::AuthError;
use crate::ports::outbound::{
    HandleResolver, KeySource, RemoteVerifier, RemoteVerifyRequest, ResolutionError,
    ResolutionQuery,
};
use async_trait::async_trait;
use hdl_types::{HandleValue, IdentityRef, HS_PUBKEY};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct DelegatedKeySource<R: HandleResolver, V: RemoteVerifier> {
    resolver: Arc<R>,
    verifier: Arc<V>,
    timeout: Duration,
    require_certified: bool,
}

impl<R: HandleResolver, V: RemoteVerifier> DelegatedKeySource<R, V> {
    pub fn new(resolver: Arc<R>, verifier: Arc<V>, timeout: Duration) -> Self {
        Self {
            resolver,
            verifier,
            timeout,
            require_certified: true,
        }
    }

    pub fn require_certified(mut self, required: bool) -> Self {
        self.require_certified = required;
        self
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ResolutionError>
    where
        F: Future<Output = Result<T, ResolutionError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ResolutionError::Timeout),
        }
    }
}

#[async_trait]
impl<R: HandleResolver, V: RemoteVerifier> KeySource for DelegatedKeySource<R, V> {
    async fn resolve_candidate_keys(
        &self,
        identity: &IdentityRef,
    ) -> Result<Vec<HandleValue>, AuthError> {
        let query = if identity.has_index() {
            ResolutionQuery::by_index(&identity.handle, identity.index)
        } else {
            ResolutionQuery::by_type(&identity.handle, HS_PUBKEY).certified()
        };

        let response = self
            .bounded(self.resolver.resolve(&query))
            .await
            .inspect_err(|e| warn!(handle = %identity.handle, error = %e, "Key resolution failed"))?;

        if query.certify && self.require_certified && !response.certified {
            warn!(handle = %identity.handle, "Rejecting uncertified key resolution");
            return Err(ResolutionError::NotCertified.into());
        }

        let mut keys: Vec<HandleValue> = response
            .values
            .into_iter()
            .filter(|v| v.has_type(HS_PUBKEY))
            .filter(|v| !identity.has_index() || v.index == identity.index)
            .collect();
        keys.sort_by_key(|v| v.index);
        debug!(handle = %identity.handle, candidates = keys.len(), "Resolved public keys");
        Ok(keys)
    }

    async fn verify_secret(&self, challenge: &SecretKeyChallenge) -> Result<Option<u32>, AuthError> {
        if !challenge.identity.has_index() {
            return Err(ResolutionError::Unsupported(
                "remote secret key verification needs an index".into(),
            )
            .into());
        }

        let request = RemoteVerifyRequest {
            handle: challenge.identity.handle.clone(),
            index: challenge.identity.index,
            server_nonce: challenge.server_nonce.clone(),
            client_nonce: challenge.client_nonce.clone(),
            hash_type: challenge.algorithm.wire_code(),
            mac: challenge.payload.clone(),
        };

        let valid = self
            .bounded(self.verifier.verify_auth(&request))
            .await
            .inspect_err(|e| {
                warn!(
                    handle = %request.handle,
                    index = request.index,
                    error = %e,
                    "Remote secret key verification failed"
                )
            })?;

        Ok(valid.then_some(challenge.identity.index))
    }
}
