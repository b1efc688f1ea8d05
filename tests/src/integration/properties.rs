//! # Protocol Properties
//!
//! Candidate ordering, session binding, outcome caching, mutual
//! authentication and concurrent use of one session.

#[cfg(test)]
mod tests {
    use crate::integration::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use hdl_auth::domain::credentials::authorization_header_with_cnonce;
    use hdl_auth::{
        authorization_header, verify_server_signature, AlgorithmId, AuthError,
        Ed25519ServerSigner, PrivateKey, PrivateKeyCredential, SecretKeyCredential, ServerSigner,
    };
    use hdl_types::IdentityRef;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn secret_credential() -> SecretKeyCredential {
        SecretKeyCredential::new(
            IdentityRef::new(HANDLE, SECRET_INDEX),
            SECRET.to_vec(),
            AlgorithmId::HmacSha256,
        )
    }

    fn ed25519_credential(seed: u8) -> PrivateKeyCredential {
        PrivateKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            PrivateKey::Ed25519(ed25519_key(seed)),
            AlgorithmId::Sha256,
        )
        .unwrap()
    }

    // =========================================================================
    // CANDIDATE ORDER
    // =========================================================================

    /// Test: keys at {5, 2, 9}, both 2 and 9 valid, index 2 authenticates
    #[tokio::test]
    async fn test_lowest_valid_index_wins() {
        let server = LocalServer::new();
        server.add_ed25519_key(5, &ed25519_key(50));
        server.add_ed25519_key(2, &ed25519_key(1));
        server.add_ed25519_key(9, &ed25519_key(1));

        let result = server.login("s1", &ed25519_credential(1)).await;
        assert_eq!(result.outcome.identity, Some(IdentityRef::new(HANDLE, 2)));
        // stops at the first match; 9 is never checked
        assert_eq!(server.keys.tried_indices(), vec![2]);
    }

    #[tokio::test]
    async fn test_explicit_index_restricts_candidates() {
        let server = LocalServer::new();
        server.add_ed25519_key(2, &ed25519_key(1));
        server.add_ed25519_key(9, &ed25519_key(1));

        let cred = PrivateKeyCredential::new(
            IdentityRef::new(HANDLE, 9),
            PrivateKey::Ed25519(ed25519_key(1)),
            AlgorithmId::Sha256,
        )
        .unwrap();
        let result = server.login("s1", &cred).await;
        assert_eq!(result.outcome.identity, Some(IdentityRef::new(HANDLE, 9)));
    }

    /// Test: index 0 is "unspecified" in both the header and Basic usernames
    #[tokio::test]
    async fn test_index_zero_means_unspecified() {
        assert_eq!(
            IdentityRef::parse("0:0.NA/1000").unwrap(),
            IdentityRef::unindexed(HANDLE)
        );

        let server = LocalServer::new();
        let basic = format!("Basic {}", BASE64.encode("0:0.NA/1000:s3cr3t"));
        let result = server.send("s1", Some(basic.as_str())).await;
        assert_eq!(result.outcome.identity, Some(IdentityRef::new(HANDLE, 300)));
    }

    // =========================================================================
    // SESSION BINDING
    // =========================================================================

    /// Test: a valid response for session A replayed on session B is rejected
    #[tokio::test]
    async fn test_replay_into_other_session() {
        let server = LocalServer::new();
        let nonce_a = server.open_session("A").await;
        server.open_session("B").await;

        let header = authorization_header(&secret_credential(), Some("A"), &nonce_a).unwrap();
        let calls = server.keys.calls();

        let result = server.send("B", Some(header.as_str())).await;
        assert_eq!(result.outcome.errors, vec![AuthError::BadSession]);
        assert_eq!(server.keys.calls(), calls);

        // still valid where it belongs
        assert!(server.send("A", Some(header.as_str())).await.outcome.succeeded);
    }

    #[tokio::test]
    async fn test_response_bound_to_session_nonce() {
        let server = LocalServer::new();
        let nonce_a = server.open_session("A").await;
        server.open_session("B").await;

        // no sessionId: the nonce of B does not match what was signed
        let header = authorization_header(&secret_credential(), None, &nonce_a).unwrap();
        let result = server.send("B", Some(header.as_str())).await;
        assert_eq!(result.outcome.diagnostics(), vec!["identity not verified"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_identity() {
        let server = LocalServer::new();
        assert!(server.login("s1", &secret_credential()).await.outcome.succeeded);

        let basic = format!("Basic {}", BASE64.encode("300:0.NA/1000:guess"));
        let failed = server.send("s1", Some(basic.as_str())).await;
        assert!(failed.outcome.is_failure());

        let later = server.send("s1", None).await;
        assert!(later.outcome.succeeded);
        assert!(!later.outcome.attempted);
        assert_eq!(later.outcome.identity, Some(IdentityRef::new(HANDLE, 300)));
    }

    // =========================================================================
    // CACHING
    // =========================================================================

    /// Test: an identical header replayed in its session skips verification
    #[tokio::test]
    async fn test_identical_header_uses_cached_outcome() {
        let server = LocalServer::new();
        let nonce = server.open_session("s1").await;
        let header = authorization_header(&secret_credential(), Some("s1"), &nonce).unwrap();

        let first = server.send("s1", Some(header.as_str())).await;
        assert!(first.outcome.succeeded);
        let calls = server.keys.calls();

        let second = server.send("s1", Some(header.as_str())).await;
        assert_eq!(server.keys.calls(), calls);
        assert_eq!(second.outcome, first.outcome);

        // a fresh cnonce is verified again
        let other = authorization_header(&secret_credential(), Some("s1"), &nonce).unwrap();
        assert!(server.send("s1", Some(other.as_str())).await.outcome.succeeded);
        assert_eq!(server.keys.calls(), calls + 1);
    }

    // =========================================================================
    // MUTUAL AUTHENTICATION
    // =========================================================================

    /// Test: same cnonce gives the same signature, a new cnonce a new one
    #[tokio::test]
    async fn test_mutual_signature_stability() {
        let signer = Arc::new(Ed25519ServerSigner::from_seed(&[42u8; 32]));
        let server_key = signer.public_key();
        let server = LocalServer::new().with_server_signer(signer);
        let nonce = server.open_session("m1").await;

        let ask = |cnonce: &[u8]| {
            format!(
                r#"Handle sessionId="m1", cnonce="{}""#,
                BASE64.encode(cnonce)
            )
        };

        let first = server.send("m1", Some(ask(b"client-1").as_str())).await;
        let again = server.send("m1", Some(ask(b"client-1").as_str())).await;
        let other = server.send("m1", Some(ask(b"client-2").as_str())).await;

        let first = first.outcome.server_signature.unwrap();
        let again = again.outcome.server_signature.unwrap();
        let other = other.outcome.server_signature.unwrap();
        assert_eq!(first, again);
        assert_ne!(first.bytes, other.bytes);

        assert!(verify_server_signature(&server_key, &nonce, b"client-1", &first));
        assert!(verify_server_signature(&server_key, &nonce, b"client-2", &other));
        assert!(!verify_server_signature(&server_key, &nonce, b"client-2", &first));
    }

    #[tokio::test]
    async fn test_no_signature_without_signer() {
        let server = LocalServer::new();
        server.open_session("m1").await;
        let result = server
            .send("m1", Some(r#"Handle sessionId="m1", cnonce="AAEC""#))
            .await;
        assert!(result.outcome.server_signature.is_none());
        assert!(!result.outcome.attempted);
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_logins_on_one_session() {
        let server = Arc::new(LocalServer::new());
        let nonce = server.open_session("c1").await;

        let tasks: Vec<_> = (0..8u8)
            .map(|i| {
                let server = Arc::clone(&server);
                let header = authorization_header_with_cnonce(
                    &secret_credential(),
                    Some("c1"),
                    &nonce,
                    &[i; 16],
                )
                .unwrap();
                tokio::spawn(async move { server.send("c1", Some(header.as_str())).await })
            })
            .collect();

        for task in tasks {
            let result = task.await.unwrap();
            assert!(result.outcome.succeeded, "{:?}", result.outcome.errors);
        }

        let state = server.service.sessions().get("c1").unwrap();
        let authenticated = state.authenticated().unwrap();
        assert_eq!(authenticated.identity, IdentityRef::new(HANDLE, 300));
        assert_eq!(state.server_nonce(), nonce.as_slice());
    }

    // =========================================================================
    // ARBITRARY INPUT
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Test: no Authorization value authenticates without the secret
        #[test]
        fn test_arbitrary_header_never_authenticates(raw in "(Handle|Basic|handle) [ -~]{0,120}") {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let outcome = runtime.block_on(async {
                let server = LocalServer::new();
                server.send("p1", Some(raw.as_str())).await.outcome
            });
            prop_assert!(!outcome.succeeded);
        }
    }
}
