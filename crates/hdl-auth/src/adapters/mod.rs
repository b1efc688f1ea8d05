//! # Adapters Module
//!
//! Infrastructure adapters implementing the ports.
//!
//! - `local` / `delegated`: the two `KeySource` backends
//! - `memory`: in-memory handle records (store, resolver and remote verifier)
//! - `session_store`: session snapshots keyed by session id
//! - `signer`: the server's mutual-authentication key

pub mod delegated;
pub mod local;
pub mod memory;
pub mod session_store;
pub mod signer;

pub use delegated::DelegatedKeySource;
pub use local::LocalKeySource;
pub use memory::InMemoryHandleStore;
pub use session_store::SessionRegistry;
pub use signer::Ed25519ServerSigner;
