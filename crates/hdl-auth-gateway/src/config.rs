//! Gateway authentication configuration with validation.

use hdl_auth::{AuthConfig, ConfigError};
use serde::{Deserialize, Serialize};

/// Default name of the session cookie.
pub const DEFAULT_SESSION_COOKIE: &str = "HDLSESSIONID";

/// HTTP-layer configuration wrapping the core [`AuthConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayAuthConfig {
    /// Cookie carrying the session id
    pub session_cookie: String,
    /// Reject `Authorization` headers that did not arrive over TLS
    pub require_secure_transport: bool,
    /// Believe `X-Forwarded-Proto`; only behind a proxy that overwrites it
    pub trust_forwarded_proto: bool,
    /// Core authentication settings
    pub auth: AuthConfig,
}

impl Default for GatewayAuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            require_secure_transport: false,
            trust_forwarded_proto: false,
            auth: AuthConfig::default(),
        }
    }
}

impl GatewayAuthConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.session_cookie.as_str();
        if name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "session_cookie cannot be empty".into(),
            ));
        }
        // RFC 6265 cookie-name is an HTTP token
        if !name.bytes().all(is_token_byte) {
            return Err(ConfigError::InvalidValue(format!(
                "session_cookie {name:?} is not a valid cookie name"
            )));
        }
        self.auth.validate()
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
