//! # Handle Authentication Test Suite
//!
//! Cross-crate tests that drive the protocol the way a client and a server
//! would.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/           # Header parsing, MAC and signature verification
//! └── src/integration/
//!     ├── mod.rs         # Shared fixtures
//!     ├── scenarios.rs   # End-to-end secret key, public key and Basic flows
//!     ├── properties.rs  # Ordering, session binding, caching, mutual auth
//!     └── gateway.rs     # The same flows over HTTP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p hdl-tests
//! cargo bench -p hdl-tests
//! ```
