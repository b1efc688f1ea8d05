//! # Client Credentials
//!
//! The credential holder's side of the exchange: answer a server nonce with a
//! signed response and render the `Authorization: Handle ...` header that
//! carries it. Administrative tools drive the protocol through these types.

use super::algorithms::{AlgorithmFamily, AlgorithmId};
use super::entities::ServerSignature;
use super::errors::AuthError;
use super::header::{self, names, AuthParams};
use super::keys::PublicKeyMaterial;
use super::mac;
use super::signed_response::{Pbkdf2Params, SignedResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hdl_types::{CredentialType, IdentityRef};
use rand::rngs::OsRng;
use rand::RngCore;
use signature::hazmat::PrehashSigner;
use zeroize::Zeroizing;

/// Protocol version sent by clients.
pub const PROTOCOL_VERSION: &str = "0";

/// Length of client nonces generated by [`authorization_header`].
pub const CLIENT_NONCE_LENGTH: usize = 16;

/// A credential able to answer a nonce pair.
pub trait Credential {
    fn identity(&self) -> &IdentityRef;

    fn credential_type(&self) -> CredentialType;

    fn algorithm(&self) -> AlgorithmId;

    /// Raw MAC or signature over `server_nonce || client_nonce`.
    fn sign(&self, server_nonce: &[u8], client_nonce: &[u8]) -> Result<Vec<u8>, AuthError>;

    /// Key-derivation parameters to advertise, PBKDF2 only.
    fn pbkdf2(&self) -> Option<&Pbkdf2Params> {
        None
    }

    /// Full signed response blob for a nonce pair.
    fn signed_response(
        &self,
        server_nonce: &[u8],
        client_nonce: &[u8],
    ) -> Result<SignedResponse, AuthError> {
        SignedResponse::from_parts(
            self.credential_type(),
            self.algorithm(),
            self.sign(server_nonce, client_nonce)?,
            self.pbkdf2().cloned(),
        )
    }
}

/// Shared secret stored as an `HS_SECKEY` value.
pub struct SecretKeyCredential {
    identity: IdentityRef,
    secret: Zeroizing<Vec<u8>>,
    algorithm: AlgorithmId,
    pbkdf2: Option<Pbkdf2Params>,
}

impl SecretKeyCredential {
    pub fn new(identity: IdentityRef, secret: impl Into<Vec<u8>>, algorithm: AlgorithmId) -> Self {
        Self {
            identity,
            secret: Zeroizing::new(secret.into()),
            algorithm,
            pbkdf2: None,
        }
    }

    /// Use PBKDF2-HMAC-SHA1 with the given derivation parameters.
    pub fn with_pbkdf2(mut self, params: Pbkdf2Params) -> Self {
        self.algorithm = AlgorithmId::Pbkdf2HmacSha1;
        self.pbkdf2 = Some(params);
        self
    }
}

impl Credential for SecretKeyCredential {
    fn identity(&self) -> &IdentityRef {
        &self.identity
    }

    fn credential_type(&self) -> CredentialType {
        CredentialType::SecretKey
    }

    fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    fn sign(&self, server_nonce: &[u8], client_nonce: &[u8]) -> Result<Vec<u8>, AuthError> {
        mac::compute_mac(
            self.algorithm,
            &self.secret,
            server_nonce,
            client_nonce,
            self.pbkdf2.as_ref(),
        )
    }

    fn pbkdf2(&self) -> Option<&Pbkdf2Params> {
        self.pbkdf2.as_ref()
    }
}

/// Private half of an `HS_PUBKEY` value.
pub enum PrivateKey {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl PrivateKey {
    pub fn public_key(&self) -> PublicKeyMaterial {
        match self {
            PrivateKey::Ed25519(sk) => PublicKeyMaterial::Ed25519(sk.verifying_key()),
            PrivateKey::Secp256k1(sk) => PublicKeyMaterial::Secp256k1(sk.verifying_key().clone()),
        }
    }
}

pub struct PrivateKeyCredential {
    identity: IdentityRef,
    key: PrivateKey,
    hash: AlgorithmId,
}

impl PrivateKeyCredential {
    /// `hash` must be a digest algorithm.
    pub fn new(identity: IdentityRef, key: PrivateKey, hash: AlgorithmId) -> Result<Self, AuthError> {
        if hash.family() != AlgorithmFamily::Digest {
            return Err(AuthError::AlgorithmUnsupported(format!(
                "{hash} with {}",
                CredentialType::PublicKey
            )));
        }
        Ok(Self {
            identity,
            key,
            hash,
        })
    }

    pub fn public_key(&self) -> PublicKeyMaterial {
        self.key.public_key()
    }
}

impl Credential for PrivateKeyCredential {
    fn identity(&self) -> &IdentityRef {
        &self.identity
    }

    fn credential_type(&self) -> CredentialType {
        CredentialType::PublicKey
    }

    fn algorithm(&self) -> AlgorithmId {
        self.hash
    }

    fn sign(&self, server_nonce: &[u8], client_nonce: &[u8]) -> Result<Vec<u8>, AuthError> {
        let message = [server_nonce, client_nonce].concat();
        match &self.key {
            PrivateKey::Ed25519(sk) => {
                use ed25519_dalek::Signer;
                Ok(sk.sign(&message).to_bytes().to_vec())
            }
            PrivateKey::Secp256k1(sk) => {
                let digest = mac::hash(self.hash, &[&message])?;
                let sig: k256::ecdsa::Signature = sk
                    .sign_prehash(&digest)
                    .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
        }
    }
}

/// Fresh random client nonce.
pub fn generate_client_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; CLIENT_NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Render the `Authorization` header answering `server_nonce` with a fresh cnonce.
pub fn authorization_header(
    credential: &dyn Credential,
    session_id: Option<&str>,
    server_nonce: &[u8],
) -> Result<String, AuthError> {
    authorization_header_with_cnonce(credential, session_id, server_nonce, &generate_client_nonce())
}

/// As [`authorization_header`] with a caller-chosen cnonce.
pub fn authorization_header_with_cnonce(
    credential: &dyn Credential,
    session_id: Option<&str>,
    server_nonce: &[u8],
    client_nonce: &[u8],
) -> Result<String, AuthError> {
    let raw = credential.sign(server_nonce, client_nonce)?;

    let mut params = AuthParams::new();
    params
        .insert(names::VERSION, PROTOCOL_VERSION)
        .insert(names::ID, credential.identity().to_string())
        .insert(names::TYPE, credential.credential_type().tag())
        .insert(names::ALG, credential.algorithm().canonical())
        .insert(names::CNONCE, BASE64.encode(client_nonce))
        .insert(names::SIGNATURE, BASE64.encode(raw));
    if let Some(session_id) = session_id {
        params.insert(names::SESSION_ID, session_id);
    }
    if let Some(pbkdf2) = credential.pbkdf2() {
        params
            .insert(names::SALT, BASE64.encode(&pbkdf2.salt))
            .insert(names::ITERATIONS, pbkdf2.iterations.to_string())
            .insert(names::LENGTH, pbkdf2.length_bits.to_string());
    }
    Ok(header::serialize(&params))
}

/// Check a `serverSignature` over `server_nonce || client_nonce`.
pub fn verify_server_signature(
    server_key: &PublicKeyMaterial,
    server_nonce: &[u8],
    client_nonce: &[u8],
    signature: &ServerSignature,
) -> bool {
    // Ed25519 names no hash; the key family decides the scheme
    let hash = AlgorithmId::resolve(&signature.algorithm)
        .ok()
        .filter(AlgorithmId::is_signature_hash)
        .unwrap_or(AlgorithmId::Sha256);
    let message = [server_nonce, client_nonce].concat();
    server_key.verify(hash, &message, &signature.bytes)
}
