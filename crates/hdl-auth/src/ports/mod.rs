//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that the HTTP layer and tools call
//! - **Outbound (Driven)**: Resolution, remote verification, storage and signing

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
