//! # Secret-Key MAC Construction
//!
//! Digest algorithms: `H(secret || sn || cn || secret)`.
//! HMAC algorithms: `HMAC(secret, sn || cn)`.
//! PBKDF2: `HMAC-SHA1(PBKDF2-HMAC-SHA1(secret, salt, iterations), sn || cn)`.

use super::algorithms::{AlgorithmFamily, AlgorithmId};
use super::errors::AuthError;
use super::signed_response::{Pbkdf2Envelope, Pbkdf2Params};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

fn digest_parts<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

/// Hash the concatenation of `parts` with a digest algorithm.
pub fn hash(algorithm: AlgorithmId, parts: &[&[u8]]) -> Result<Vec<u8>, AuthError> {
    match algorithm {
        AlgorithmId::Md5 => Ok(digest_parts::<Md5>(parts)),
        AlgorithmId::Sha1 => Ok(digest_parts::<Sha1>(parts)),
        AlgorithmId::Sha256 => Ok(digest_parts::<Sha256>(parts)),
        other => Err(AuthError::AlgorithmUnsupported(format!(
            "{other} is not a digest"
        ))),
    }
}

fn keyed<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, AuthError> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| AuthError::MalformedResponse("invalid HMAC key".into()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_parts(algorithm: AlgorithmId, key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, AuthError> {
    match algorithm {
        AlgorithmId::HmacSha1 | AlgorithmId::Pbkdf2HmacSha1 => keyed::<HmacSha1>(key, parts),
        AlgorithmId::HmacSha256 => keyed::<HmacSha256>(key, parts),
        other => Err(AuthError::AlgorithmUnsupported(format!("{other} is not a MAC"))),
    }
}

/// Compute the raw MAC a secret-key holder produces for a nonce pair.
pub fn compute_mac(
    algorithm: AlgorithmId,
    secret: &[u8],
    server_nonce: &[u8],
    client_nonce: &[u8],
    pbkdf2: Option<&Pbkdf2Params>,
) -> Result<Vec<u8>, AuthError> {
    match algorithm.family() {
        AlgorithmFamily::Digest => hash(algorithm, &[secret, server_nonce, client_nonce, secret]),
        AlgorithmFamily::Hmac => hmac_parts(algorithm, secret, &[server_nonce, client_nonce]),
        AlgorithmFamily::Pbkdf2 => {
            let params = pbkdf2.ok_or_else(|| {
                AuthError::IncompleteAuthentication("PBKDF2 parameters missing".into())
            })?;
            let mut derived = Zeroizing::new(vec![0u8; params.length_bytes()]);
            pbkdf2::pbkdf2_hmac::<Sha1>(secret, &params.salt, params.iterations, &mut derived);
            hmac_parts(algorithm, &derived, &[server_nonce, client_nonce])
        }
    }
}

/// Produce the secret-key payload (the bytes after the algorithm code).
pub fn respond(
    algorithm: AlgorithmId,
    secret: &[u8],
    server_nonce: &[u8],
    client_nonce: &[u8],
    pbkdf2: Option<Pbkdf2Params>,
) -> Result<Vec<u8>, AuthError> {
    let mac = compute_mac(algorithm, secret, server_nonce, client_nonce, pbkdf2.as_ref())?;
    match (algorithm.family(), pbkdf2) {
        (AlgorithmFamily::Pbkdf2, Some(params)) => Ok(Pbkdf2Envelope { params, mac }.encode()),
        _ => Ok(mac),
    }
}

/// Recompute and compare a secret-key payload in constant time.
///
/// `Ok(false)` means the secret does not match. Errors mean the payload could
/// not be checked at all.
pub fn verify_payload(
    algorithm: AlgorithmId,
    secret: &[u8],
    server_nonce: &[u8],
    client_nonce: &[u8],
    payload: &[u8],
    max_iterations: u32,
) -> Result<bool, AuthError> {
    let (expected, presented) = match algorithm.family() {
        AlgorithmFamily::Pbkdf2 => {
            let envelope = Pbkdf2Envelope::decode(payload)?;
            envelope.params.validate(max_iterations)?;
            let expected = compute_mac(
                algorithm,
                secret,
                server_nonce,
                client_nonce,
                Some(&envelope.params),
            )?;
            (expected, envelope.mac)
        }
        _ => (
            compute_mac(algorithm, secret, server_nonce, client_nonce, None)?,
            payload.to_vec(),
        ),
    };
    Ok(expected.len() == presented.len() && bool::from(expected.ct_eq(&presented)))
}
