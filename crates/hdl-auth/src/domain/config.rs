//! Authentication configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default cap on client-chosen PBKDF2 iterations.
pub const DEFAULT_MAX_PBKDF2_ITERATIONS: u32 = 10_000;

/// Default bound on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 100_000;

/// Default idle lifetime of a session.
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// Tunables for the orchestrator and its verifier backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Server nonce length in bytes
    pub nonce_length: usize,
    /// Upper bound on one delegated resolution or verification call
    #[serde(with = "humantime_serde")]
    pub verification_timeout: Duration,
    /// Accept `Authorization: Basic` as a secret-key credential
    pub allow_basic: bool,
    /// Reject unindexed public-key lookups whose resolution is not certified
    pub require_certified_resolution: bool,
    /// Sessions unused for longer than this are purged
    #[serde(with = "humantime_serde")]
    pub session_max_age: Duration,
    /// Live sessions kept at most; the least recently used is evicted
    pub max_sessions: usize,
    /// Cap on client-chosen PBKDF2 work
    pub max_pbkdf2_iterations: u32,
    /// Answer mutual-authentication requests when a signer is configured
    pub server_signing: bool,
}

impl AuthConfig {
    pub const MIN_NONCE_LENGTH: usize = 8;
    pub const MAX_NONCE_LENGTH: usize = 64;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_NONCE_LENGTH..=Self::MAX_NONCE_LENGTH).contains(&self.nonce_length) {
            return Err(ConfigError::InvalidNonceLength(self.nonce_length));
        }

        if self.verification_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "verification_timeout cannot be 0".into(),
            ));
        }

        if self.session_max_age.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "session_max_age cannot be 0".into(),
            ));
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::InvalidLimit("max_sessions cannot be 0".into()));
        }

        if self.max_pbkdf2_iterations == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_pbkdf2_iterations cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            nonce_length: 16,
            verification_timeout: Duration::from_secs(10),
            allow_basic: true,
            require_certified_resolution: true,
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_pbkdf2_iterations: DEFAULT_MAX_PBKDF2_ITERATIONS,
            server_signing: true,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Nonce length {0} outside 8..=64 bytes")]
    InvalidNonceLength(usize),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Serde helpers for durations written as "10s", "500ms", "30m" or "2h".
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else if let Some(hours) = s.strip_suffix('h') {
            hours
                .trim()
                .parse::<u64>()
                .map(|h| Duration::from_secs(h * 3600))
                .map_err(|_| "invalid hours")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration")
        }
    }
}
