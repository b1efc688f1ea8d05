//! # Handle Authentication
//!
//! Nonce-based challenge-response identity verification for Handle
//! credentials: secret keys (`HS_SECKEY`) and public keys (`HS_PUBKEY`).
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Algorithm registry, header codec, MACs,
//!   key decoding and session snapshots. No I/O.
//! - **Ports Layer** (`ports/`): Inbound API and outbound resolution, remote
//!   verification, storage and signing traits
//! - **Adapters** (`adapters/`): Local and delegated key sources, in-memory
//!   store, session registry, server signer
//! - **Verifier** (`verifier.rs`): Decides which indexed credential a response proves
//! - **Service Layer** (`service.rs`): Per-request orchestration
//!
//! ## Security Notes
//!
//! - MACs are compared in constant time
//! - Shared secrets and derived keys are zeroized on drop
//! - Delegated public keys require certified resolution unless configured otherwise
//! - A failed attempt never clears an identity the session already proved

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod verifier;

// Re-export public API
pub use adapters::{
    DelegatedKeySource, Ed25519ServerSigner, InMemoryHandleStore, LocalKeySource, SessionRegistry,
};
pub use domain::algorithms::{AlgorithmFamily, AlgorithmId, ALGORITHMS};
pub use domain::config::{AuthConfig, ConfigError};
pub use domain::credentials::{
    authorization_header, verify_server_signature, Credential, PrivateKey, PrivateKeyCredential,
    SecretKeyCredential,
};
pub use domain::entities::{
    AuthenticationOutcome, SecretKeyChallenge, ServerSignature, VerificationRequest,
};
pub use domain::errors::AuthError;
pub use domain::header::{AuthParams, BasicCredentials};
pub use domain::keys::{KeyDecodeError, PublicKeyMaterial};
pub use domain::session::SessionAuthState;
pub use domain::signed_response::{Pbkdf2Params, SignedResponse};
pub use ports::inbound::{
    AuthenticationApi, AuthenticationRequest, AuthenticationResult, IdentityVerificationApi,
};
pub use ports::outbound::{
    HandleResolver, HandleStore, KeySource, RemoteVerifier, ResolutionError, ServerSigner,
};
pub use service::AuthenticationService;
pub use verifier::IdentityVerifier;
