//! # Handle Authentication Gateway
//!
//! HTTP binding for `hdl-auth`: a tower layer for axum that runs the
//! authentication orchestrator per request.
//!
//! ## Request flow
//!
//! ```text
//! Request -> session cookie -> [insecure transport check] -> orchestrator
//!         -> 401 + WWW-Authenticate        (attempted, not succeeded)
//!         -> handler (outcome in extensions) + WWW-Authenticate / Set-Cookie
//! ```
//!
//! Handlers read the result with `Extension<AuthenticationOutcome>`. Deciding
//! that a path needs an identity is up to the handler.

pub mod challenge;
pub mod config;
pub mod layer;
pub mod session;

pub use challenge::{render_challenge, render_error};
pub use config::{GatewayAuthConfig, DEFAULT_SESSION_COOKIE};
pub use layer::{HandleAuthLayer, HandleAuthService, SecureTransport};
pub use session::SessionId;
