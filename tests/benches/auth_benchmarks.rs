//! # Handle Authentication Benchmarks
//!
//! | Path | Operation |
//! |------|-----------|
//! | Header codec | parse a full `Authorization: Handle` value |
//! | Secret key | recompute and compare a MAC per algorithm |
//! | Public key | decode a key record and verify a signature |
//! | Orchestrator | one complete secret-key request |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hdl_auth::domain::{header, mac};
use hdl_auth::{
    authorization_header, AlgorithmId, AuthConfig, AuthenticationApi, AuthenticationRequest,
    AuthenticationService, Credential, InMemoryHandleStore, LocalKeySource, Pbkdf2Params,
    PrivateKey, PrivateKeyCredential, PublicKeyMaterial, SecretKeyCredential, SessionRegistry,
};
use hdl_types::{HandleValue, IdentityRef, HS_SECKEY};
use std::sync::Arc;
use std::time::Duration;

const HANDLE: &str = "0.NA/1000";
const SERVER_NONCE: &[u8] = b"0123456789abcdef";
const CLIENT_NONCE: &[u8] = b"fedcba9876543210";

fn bench_header_parse(c: &mut Criterion) {
    let cred = SecretKeyCredential::new(
        IdentityRef::new(HANDLE, 300),
        b"s3cr3t".to_vec(),
        AlgorithmId::Sha256,
    );
    let raw = authorization_header(&cred, Some("session-1"), SERVER_NONCE).unwrap();

    c.bench_function("header_parse", |b| {
        b.iter(|| black_box(header::parse(black_box(&raw))))
    });
}

fn bench_secret_key_mac(c: &mut Criterion) {
    let mut group = c.benchmark_group("secret-key-mac");

    for alg in [
        AlgorithmId::Md5,
        AlgorithmId::Sha1,
        AlgorithmId::Sha256,
        AlgorithmId::HmacSha1,
        AlgorithmId::HmacSha256,
    ] {
        let payload = mac::respond(alg, b"s3cr3t", SERVER_NONCE, CLIENT_NONCE, None).unwrap();
        group.bench_with_input(BenchmarkId::new("verify", alg), &payload, |b, payload| {
            b.iter(|| {
                mac::verify_payload(alg, b"s3cr3t", SERVER_NONCE, CLIENT_NONCE, payload, 1_000_000)
            })
        });
    }

    for iterations in [1_000u32, 10_000] {
        let params = Pbkdf2Params::new(b"NaCl".to_vec(), iterations, 160);
        let payload = mac::respond(
            AlgorithmId::Pbkdf2HmacSha1,
            b"s3cr3t",
            SERVER_NONCE,
            CLIENT_NONCE,
            Some(params),
        )
        .unwrap();
        group.bench_with_input(
            BenchmarkId::new("verify_pbkdf2", iterations),
            &payload,
            |b, payload| {
                b.iter(|| {
                    mac::verify_payload(
                        AlgorithmId::Pbkdf2HmacSha1,
                        b"s3cr3t",
                        SERVER_NONCE,
                        CLIENT_NONCE,
                        payload,
                        1_000_000,
                    )
                })
            },
        );
    }
    group.finish();
}

fn bench_public_key_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("public-key");
    group.measurement_time(Duration::from_secs(5));
    let message = [SERVER_NONCE, CLIENT_NONCE].concat();

    let keys = [
        (
            "ed25519",
            PrivateKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&[1u8; 32])),
        ),
        (
            "secp256k1",
            PrivateKey::Secp256k1(k256::ecdsa::SigningKey::from_slice(&[2u8; 32]).unwrap()),
        ),
    ];
    for (name, key) in keys {
        let record = key.public_key().encode();
        let cred =
            PrivateKeyCredential::new(IdentityRef::unindexed(HANDLE), key, AlgorithmId::Sha256)
                .unwrap();
        let signature = cred.sign(SERVER_NONCE, CLIENT_NONCE).unwrap();

        group.bench_function(BenchmarkId::new("decode_and_verify", name), |b| {
            b.iter(|| {
                PublicKeyMaterial::decode(black_box(&record))
                    .map(|key| key.verify(AlgorithmId::Sha256, &message, &signature))
            })
        });
    }
    group.finish();
}

fn bench_orchestrator(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryHandleStore::new());
    store.put_value(HANDLE, HandleValue::new(300, HS_SECKEY, b"s3cr3t".to_vec()));
    let config = AuthConfig::default();
    let service = AuthenticationService::new(
        Arc::new(LocalKeySource::new(store, config.max_pbkdf2_iterations)),
        Arc::new(SessionRegistry::new(config.nonce_length)),
        config,
    );
    let nonce = runtime.block_on(async {
        service
            .authenticate(
                AuthenticationRequest::new("bench").with_authorization(r#"Handle version="0""#),
            )
            .await
            .server_nonce
    });
    let cred = SecretKeyCredential::new(
        IdentityRef::new(HANDLE, 300),
        b"s3cr3t".to_vec(),
        AlgorithmId::HmacSha256,
    );

    c.bench_function("orchestrator_secret_key_request", |b| {
        b.iter(|| {
            // a fresh cnonce each time so the cached outcome is never used
            let header = authorization_header(&cred, Some("bench"), &nonce).unwrap();
            runtime.block_on(async {
                service
                    .authenticate(AuthenticationRequest::new("bench").with_authorization(header))
                    .await
            })
        })
    });
}

criterion_group!(
    benches,
    bench_header_parse,
    bench_secret_key_mac,
    bench_public_key_verify,
    bench_orchestrator
);
criterion_main!(benches);
