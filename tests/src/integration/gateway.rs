//! # HTTP Flows
//!
//! The protocol driven over axum through `HandleAuthLayer`: challenge,
//! public-key login with mutual authentication, and the 401 path.

#[cfg(test)]
mod tests {
    use crate::integration::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use axum::{routing::get, Extension, Router};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use hdl_auth::domain::header::parse;
    use hdl_auth::domain::credentials::authorization_header_with_cnonce;
    use hdl_auth::{
        verify_server_signature, AlgorithmId, AuthenticationOutcome, Ed25519ServerSigner,
        PrivateKey, PrivateKeyCredential, ServerSignature, ServerSigner,
    };
    use hdl_auth_gateway::{GatewayAuthConfig, HandleAuthLayer};
    use hdl_types::IdentityRef;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn whoami(Extension(outcome): Extension<AuthenticationOutcome>) -> String {
        match outcome.identity {
            Some(identity) => identity.to_string(),
            None => "anonymous".to_string(),
        }
    }

    fn router(server: LocalServer) -> Router {
        Router::new().route("/", get(whoami)).layer(HandleAuthLayer::new(
            Arc::new(server.service),
            GatewayAuthConfig::default(),
        ))
    }

    fn get_request(cookie: Option<&str>, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("HDLSESSIONID={cookie}"));
        }
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn challenge_param(response: &Response, name: &str) -> Option<String> {
        let value = response.headers().get(header::WWW_AUTHENTICATE)?;
        parse(value.to_str().ok()?)?.get(name).map(str::to_string)
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Test: challenge, then public-key login that also asks for nothing more
    #[tokio::test]
    async fn test_public_key_login_over_http() {
        let server = LocalServer::new();
        server.add_ed25519_key(301, &ed25519_key(8));
        let app = router(server);

        let first = app
            .clone()
            .oneshot(get_request(None, Some(r#"Handle version="0""#)))
            .await
            .unwrap();
        let session_id = challenge_param(&first, "sessionId").unwrap();
        let nonce = BASE64
            .decode(challenge_param(&first, "nonce").unwrap())
            .unwrap();

        let cred = PrivateKeyCredential::new(
            IdentityRef::unindexed(HANDLE),
            PrivateKey::Ed25519(ed25519_key(8)),
            AlgorithmId::Sha256,
        )
        .unwrap();
        let authorization =
            authorization_header_with_cnonce(&cred, Some(&session_id), &nonce, b"cn").unwrap();
        let second = app
            .clone()
            .oneshot(get_request(Some(&session_id), Some(authorization.as_str())))
            .await
            .unwrap();

        assert_eq!(second.status(), StatusCode::OK);
        assert!(challenge_param(&second, "error").is_none());
        let rotated = challenge_param(&second, "sessionId").unwrap();
        assert_ne!(rotated, session_id);
        assert_eq!(text(second).await, "301:0.NA/1000");

        let later = app
            .clone()
            .oneshot(get_request(Some(&rotated), None))
            .await
            .unwrap();
        assert_eq!(text(later).await, "301:0.NA/1000");
        let stale = app
            .oneshot(get_request(Some(&session_id), None))
            .await
            .unwrap();
        assert_eq!(text(stale).await, "anonymous");
    }

    #[tokio::test]
    async fn test_server_signature_in_challenge() {
        let signer = Arc::new(Ed25519ServerSigner::from_seed(&[3u8; 32]));
        let server_key = signer.public_key();
        let app = router(LocalServer::new().with_server_signer(signer));

        let response = app
            .oneshot(get_request(None, Some(r#"Handle cnonce="Y2xpZW50""#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let nonce = BASE64
            .decode(challenge_param(&response, "nonce").unwrap())
            .unwrap();
        let signature = ServerSignature {
            algorithm: challenge_param(&response, "serverAlg").unwrap(),
            bytes: BASE64
                .decode(challenge_param(&response, "serverSignature").unwrap())
                .unwrap(),
        };
        assert_eq!(signature.algorithm, "Ed25519");
        assert!(verify_server_signature(&server_key, &nonce, b"client", &signature));
    }

    #[tokio::test]
    async fn test_unsupported_algorithm_over_http() {
        let app = router(LocalServer::new());
        let authorization = r#"Handle id="0.NA/1000", cnonce="AA==", type="HS_PUBKEY", alg="ROT13", signature="AA==""#;
        let response = app
            .oneshot(get_request(None, Some(authorization)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            challenge_param(&response, "error").as_deref(),
            Some("unsupported algorithm")
        );
        assert!(challenge_param(&response, "nonce").is_some());
    }

    #[tokio::test]
    async fn test_basic_over_http() {
        let app = router(LocalServer::new());
        let basic = format!("Basic {}", BASE64.encode("300:0.NA/1000:s3cr3t"));
        let response = app
            .oneshot(get_request(None, Some(basic.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        assert_eq!(text(response).await, "300:0.NA/1000");
    }
}
