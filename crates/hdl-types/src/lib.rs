//! # Handle Types Crate
//!
//! Value types shared by the Handle authentication crates.
//!
//! ## Design Principles
//!
//! - **Immutable identities**: `IdentityRef` is a plain value; the claimed
//!   identity and the authenticated identity are the same type.
//! - **One binary codec**: every length-prefixed layout in the protocol
//!   (signed responses, PBKDF2 envelopes, public key records) goes through
//!   `encoding`.

pub mod encoding;
pub mod entities;
pub mod errors;

pub use encoding::{ByteReader, ByteWriter};
pub use entities::*;
pub use errors::*;
