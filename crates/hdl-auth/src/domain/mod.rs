//! # Domain Layer
//!
//! Pure protocol logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod algorithms;
pub mod config;
pub mod credentials;
pub mod entities;
pub mod errors;
pub mod header;
pub mod keys;
pub mod mac;
pub mod session;
pub mod signed_response;
