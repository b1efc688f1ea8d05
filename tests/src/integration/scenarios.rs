//! # End-to-End Scenarios
//!
//! One request flow per credential kind, through the orchestrator with both
//! the local and the delegated backend.

#[cfg(test)]
mod tests {
    use crate::integration::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use hdl_auth::{
        AlgorithmId, AuthConfig, AuthError, AuthenticationApi, AuthenticationRequest,
        AuthenticationService, DelegatedKeySource, InMemoryHandleStore, Pbkdf2Params, PrivateKey,
        PrivateKeyCredential, SecretKeyCredential, SessionRegistry,
    };
    use hdl_types::{CredentialType, HandleValue, IdentityRef, HS_PUBKEY, HS_SECKEY};
    use std::sync::Arc;

    fn secret_credential(alg: AlgorithmId) -> SecretKeyCredential {
        SecretKeyCredential::new(IdentityRef::new(HANDLE, SECRET_INDEX), SECRET.to_vec(), alg)
    }

    // =========================================================================
    // SECRET KEY
    // =========================================================================

    /// Test: SHA-256 MAC over the nonce pair authenticates index 300
    #[tokio::test]
    async fn test_secret_key_happy_path() {
        let server = LocalServer::new();
        let result = server
            .login("s1", &secret_credential(AlgorithmId::Sha256))
            .await;

        let outcome = result.outcome;
        assert!(outcome.attempted);
        assert!(outcome.succeeded, "{:?}", outcome.errors);
        assert_eq!(outcome.identity, Some(IdentityRef::new(HANDLE, 300)));
        assert_eq!(outcome.credential_type, Some(CredentialType::SecretKey));
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_every_secret_key_algorithm() {
        let server = LocalServer::new();
        for (i, alg) in [
            AlgorithmId::Md5,
            AlgorithmId::Sha1,
            AlgorithmId::Sha256,
            AlgorithmId::HmacSha1,
            AlgorithmId::HmacSha256,
        ]
        .into_iter()
        .enumerate()
        {
            let result = server.login(&format!("s{i}"), &secret_credential(alg)).await;
            assert!(result.outcome.succeeded, "{alg}: {:?}", result.outcome.errors);
        }

        let pbkdf2 = secret_credential(AlgorithmId::Sha1)
            .with_pbkdf2(Pbkdf2Params::new(b"NaCl".to_vec(), 100, 256));
        assert!(server.login("pbkdf2", &pbkdf2).await.outcome.succeeded);
    }

    #[tokio::test]
    async fn test_pbkdf2_iterations_over_limit_are_rejected() {
        let server = LocalServer::with_config(AuthConfig {
            max_pbkdf2_iterations: 50,
            ..Default::default()
        });
        let cred = secret_credential(AlgorithmId::Sha1)
            .with_pbkdf2(Pbkdf2Params::new(b"NaCl".to_vec(), 51, 160));
        let result = server.login("s1", &cred).await;
        assert_eq!(result.outcome.diagnostics(), vec!["malformed signed response"]);
        assert_eq!(server.keys.calls(), 0);
    }

    // =========================================================================
    // PUBLIC KEY
    // =========================================================================

    /// Test: an unknown algorithm name fails before any key lookup
    #[tokio::test]
    async fn test_public_key_unknown_algorithm() {
        let server = LocalServer::new();
        server.add_ed25519_key(301, &ed25519_key(1));
        server.open_session("s1").await;

        let header = r#"Handle sessionId="s1", id="0.NA/1000", cnonce="AAEC", type="HS_PUBKEY", alg="ROT13", signature="AAEC""#;
        let result = server.send("s1", Some(header)).await;

        assert!(result.outcome.is_failure());
        assert!(matches!(
            result.outcome.errors.as_slice(),
            [AuthError::AlgorithmUnsupported(_)]
        ));
        assert_eq!(result.outcome.diagnostics(), vec!["unsupported algorithm"]);
        assert_eq!(server.keys.calls(), 0);
    }

    #[tokio::test]
    async fn test_public_key_secp256k1() {
        let server = LocalServer::new();
        let key = k256::ecdsa::SigningKey::from_slice(&[7u8; 32]).unwrap();
        server.store.put_value(
            HANDLE,
            HandleValue::new(
                302,
                HS_PUBKEY,
                PrivateKey::Secp256k1(key.clone()).public_key().encode(),
            ),
        );

        let cred = PrivateKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            PrivateKey::Secp256k1(key),
            AlgorithmId::Sha256,
        )
        .unwrap();
        let result = server.login("s1", &cred).await;
        assert!(result.outcome.succeeded, "{:?}", result.outcome.errors);
        assert_eq!(result.outcome.identity, Some(IdentityRef::new(HANDLE, 302)));
        assert_eq!(result.outcome.credential_type, Some(CredentialType::PublicKey));
    }

    #[tokio::test]
    async fn test_public_key_without_published_keys() {
        let server = LocalServer::new();
        let cred = PrivateKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            PrivateKey::Ed25519(ed25519_key(3)),
            AlgorithmId::Sha256,
        )
        .unwrap();
        let result = server.login("s1", &cred).await;
        assert_eq!(result.outcome.diagnostics(), vec!["no public key found"]);
    }

    // =========================================================================
    // DELEGATED
    // =========================================================================

    fn delegated(
        authority: Arc<InMemoryHandleStore>,
    ) -> AuthenticationService<DelegatedKeySource<InMemoryHandleStore, InMemoryHandleStore>> {
        let config = AuthConfig::default();
        let keys = DelegatedKeySource::new(
            authority.clone(),
            authority,
            config.verification_timeout,
        )
        .require_certified(config.require_certified_resolution);
        AuthenticationService::new(
            Arc::new(keys),
            Arc::new(SessionRegistry::new(config.nonce_length)),
            config,
        )
    }

    async fn delegated_login(
        service: &AuthenticationService<
            DelegatedKeySource<InMemoryHandleStore, InMemoryHandleStore>,
        >,
        credential: &dyn hdl_auth::Credential,
    ) -> hdl_auth::AuthenticationOutcome {
        let opened = service
            .authenticate(AuthenticationRequest::new("d1").with_authorization(r#"Handle version="0""#))
            .await;
        let header =
            hdl_auth::authorization_header(credential, Some("d1"), &opened.server_nonce).unwrap();
        service
            .authenticate(AuthenticationRequest::new("d1").with_authorization(header))
            .await
            .outcome
    }

    /// Test: resolution answers "not found"; the failure stays inside the outcome
    #[tokio::test]
    async fn test_delegated_unresolvable_handle() {
        let service = delegated(Arc::new(InMemoryHandleStore::new()));
        let cred = PrivateKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            PrivateKey::Ed25519(ed25519_key(4)),
            AlgorithmId::Sha256,
        )
        .unwrap();

        let outcome = delegated_login(&service, &cred).await;
        assert!(outcome.is_failure());
        assert!(matches!(
            outcome.errors.as_slice(),
            [AuthError::IdentityUnresolvable(_)]
        ));
        assert_eq!(outcome.diagnostics(), vec!["identity not resolvable"]);
    }

    #[tokio::test]
    async fn test_delegated_public_key() {
        let authority = Arc::new(InMemoryHandleStore::new());
        let key = ed25519_key(5);
        authority.put_value(
            HANDLE,
            HandleValue::new(
                310,
                HS_PUBKEY,
                PrivateKey::Ed25519(key.clone()).public_key().encode(),
            ),
        );
        let service = delegated(authority);
        let cred = PrivateKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            PrivateKey::Ed25519(key),
            AlgorithmId::Sha1,
        )
        .unwrap();

        let outcome = delegated_login(&service, &cred).await;
        assert!(outcome.succeeded, "{:?}", outcome.errors);
        assert_eq!(outcome.identity, Some(IdentityRef::new(HANDLE, 310)));
    }

    #[tokio::test]
    async fn test_delegated_uncertified_resolution_rejected() {
        let relay = Arc::new(InMemoryHandleStore::new().uncertified());
        let key = ed25519_key(6);
        relay.put_value(
            HANDLE,
            HandleValue::new(
                310,
                HS_PUBKEY,
                PrivateKey::Ed25519(key.clone()).public_key().encode(),
            ),
        );
        let service = delegated(relay);
        let cred = PrivateKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            PrivateKey::Ed25519(key),
            AlgorithmId::Sha256,
        )
        .unwrap();

        let outcome = delegated_login(&service, &cred).await;
        assert_eq!(outcome.diagnostics(), vec!["identity not resolvable"]);
    }

    #[tokio::test]
    async fn test_delegated_secret_key() {
        let authority = Arc::new(InMemoryHandleStore::new());
        authority.put_value(HANDLE, HandleValue::new(300, HS_SECKEY, SECRET.to_vec()));
        let service = delegated(authority);

        let outcome = delegated_login(&service, &secret_credential(AlgorithmId::HmacSha256)).await;
        assert!(outcome.succeeded, "{:?}", outcome.errors);
        assert_eq!(outcome.identity, Some(IdentityRef::new(HANDLE, 300)));

        // without an index the authority cannot be asked
        let unindexed = SecretKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            SECRET.to_vec(),
            AlgorithmId::HmacSha256,
        );
        let outcome = delegated_login(&service, &unindexed).await;
        assert_eq!(outcome.diagnostics(), vec!["identity not resolvable"]);
    }

    // =========================================================================
    // BASIC
    // =========================================================================

    /// Test: Basic credentials authenticate through the secret-key path alone
    #[tokio::test]
    async fn test_basic_fallback() {
        let server = LocalServer::new();
        let basic = format!("Basic {}", BASE64.encode("300:0.NA/1000:s3cr3t"));
        let result = server.send("s1", Some(basic.as_str())).await;

        assert!(result.outcome.succeeded, "{:?}", result.outcome.errors);
        assert_eq!(result.outcome.identity, Some(IdentityRef::new(HANDLE, 300)));
        assert_eq!(result.outcome.credential_type, Some(CredentialType::SecretKey));
        assert!(result.outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_basic_without_index_finds_secret() {
        let server = LocalServer::new();
        let basic = format!("Basic {}", BASE64.encode("0.NA/1000:s3cr3t"));
        let result = server.send("s1", Some(basic.as_str())).await;
        assert_eq!(result.outcome.identity, Some(IdentityRef::new(HANDLE, 300)));
    }

    #[tokio::test]
    async fn test_basic_wrong_password() {
        let server = LocalServer::new();
        let basic = format!("Basic {}", BASE64.encode("300:0.NA/1000:guess"));
        let result = server.send("s1", Some(basic.as_str())).await;
        assert!(result.outcome.is_failure());
        assert_eq!(result.outcome.diagnostics(), vec!["identity not verified"]);
    }
}
