//! In-Memory Handle Store Adapter
//!
//! Holds handle records in process memory. Serves as the local store for
//! `LocalKeySource` and, answering as the authoritative server, as the
//! resolver and remote verifier behind `DelegatedKeySource`.

use crate::domain::algorithms::ALGORITHMS;
use crate::domain::config::DEFAULT_MAX_PBKDF2_ITERATIONS;
use crate::domain::mac;
use crate::ports::outbound::{
    HandleResolver, HandleStore, RemoteVerifier, RemoteVerifyRequest, ResolutionError,
    ResolutionQuery, ResolutionResponse,
};
use async_trait::async_trait;
use hdl_types::{HandleValue, HS_SECKEY};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Handle records keyed by handle.
pub struct InMemoryHandleStore {
    records: RwLock<HashMap<String, Vec<HandleValue>>>,
    /// Whether resolution responses are reported as certified.
    certify: bool,
    max_pbkdf2_iterations: u32,
}

impl InMemoryHandleStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            certify: true,
            max_pbkdf2_iterations: DEFAULT_MAX_PBKDF2_ITERATIONS,
        }
    }

    /// Report responses as uncertified, as a relaying resolver would.
    pub fn uncertified(mut self) -> Self {
        self.certify = false;
        self
    }

    pub fn with_max_pbkdf2_iterations(mut self, max: u32) -> Self {
        self.max_pbkdf2_iterations = max;
        self
    }

    /// Add or replace a value; a value with the same index is overwritten.
    pub fn put_value(&self, handle: &str, value: HandleValue) {
        let mut records = self.records.write();
        let values = records.entry(handle.to_string()).or_default();
        values.retain(|v| v.index != value.index);
        values.push(value);
    }

    pub fn remove_handle(&self, handle: &str) -> bool {
        self.records.write().remove(handle).is_some()
    }

    pub fn handle_count(&self) -> usize {
        self.records.read().len()
    }
}

impl Default for InMemoryHandleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleStore for InMemoryHandleStore {
    fn values(&self, handle: &str) -> Result<Vec<HandleValue>, ResolutionError> {
        self.records
            .read()
            .get(handle)
            .cloned()
            .ok_or_else(|| ResolutionError::NotFound(handle.to_string()))
    }
}

#[async_trait]
impl HandleResolver for InMemoryHandleStore {
    async fn resolve(&self, query: &ResolutionQuery) -> Result<ResolutionResponse, ResolutionError> {
        let values = self
            .values(&query.handle)?
            .into_iter()
            .filter(|v| query.matches(v))
            .collect();
        Ok(ResolutionResponse {
            values,
            certified: query.certify && self.certify,
        })
    }
}

#[async_trait]
impl RemoteVerifier for InMemoryHandleStore {
    async fn verify_auth(&self, request: &RemoteVerifyRequest) -> Result<bool, ResolutionError> {
        let algorithm = ALGORITHMS
            .by_wire_code(request.hash_type)
            .map_err(|e| ResolutionError::Unsupported(e.to_string()))?
            .id;

        let values = self.values(&request.handle)?;
        let Some(secret) = values
            .iter()
            .find(|v| v.index == request.index && v.has_type(HS_SECKEY))
        else {
            debug!(handle = %request.handle, index = request.index, "No secret key at index");
            return Ok(false);
        };

        mac::verify_payload(
            algorithm,
            &secret.data,
            &request.server_nonce,
            &request.client_nonce,
            &request.mac,
            self.max_pbkdf2_iterations,
        )
        .map_err(|e| ResolutionError::MalformedResponse(e.to_string()))
    }
}
