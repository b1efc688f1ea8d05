//! Ed25519 server signing key for mutual authentication.

use crate::domain::keys::PublicKeyMaterial;
use crate::ports::outbound::{ServerSigner, SignerError};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

pub const ED25519_ALGORITHM: &str = "Ed25519";

pub struct Ed25519ServerSigner {
    key: SigningKey,
}

impl Ed25519ServerSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }
}

impl ServerSigner for Ed25519ServerSigner {
    fn algorithm(&self) -> &str {
        ED25519_ALGORITHM
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.key
            .try_sign(message)
            .map(|sig| sig.to_bytes().to_vec())
            .map_err(|e| SignerError::Failed(e.to_string()))
    }

    fn public_key(&self) -> PublicKeyMaterial {
        PublicKeyMaterial::Ed25519(self.key.verifying_key())
    }
}
