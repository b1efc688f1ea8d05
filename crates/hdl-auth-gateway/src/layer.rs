//! Handle authentication middleware.
//!
//! Runs the orchestrator for every request, exposes the outcome to handlers
//! through request extensions, and answers failed attempts with 401.

use crate::challenge::{render_challenge, render_error};
use crate::config::GatewayAuthConfig;
use crate::session::SessionId;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE, WWW_AUTHENTICATE},
        uri::Scheme,
        HeaderName, HeaderValue, Request, StatusCode,
    },
    response::Response,
};
use hdl_auth::{AuthError, AuthenticationApi, AuthenticationRequest};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Request extension set by a TLS-terminating acceptor.
#[derive(Debug, Clone, Copy)]
pub struct SecureTransport;

/// Authentication layer
pub struct HandleAuthLayer<A> {
    api: Arc<A>,
    config: Arc<GatewayAuthConfig>,
}

impl<A> HandleAuthLayer<A> {
    pub fn new(api: Arc<A>, config: GatewayAuthConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
        }
    }
}

impl<A> Clone for HandleAuthLayer<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, A> Layer<S> for HandleAuthLayer<A> {
    type Service = HandleAuthService<S, A>;

    fn layer(&self, inner: S) -> Self::Service {
        HandleAuthService {
            inner,
            api: Arc::clone(&self.api),
            config: Arc::clone(&self.config),
        }
    }
}

/// Authentication service
pub struct HandleAuthService<S, A> {
    inner: S,
    api: Arc<A>,
    config: Arc<GatewayAuthConfig>,
}

impl<S: Clone, A> Clone for HandleAuthService<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            api: Arc::clone(&self.api),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, A> Service<Request<Body>> for HandleAuthService<S, A>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    A: AuthenticationApi + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let api = Arc::clone(&self.api);
        let config = Arc::clone(&self.config);
        // keep the instance that was polled ready
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let secure = is_secure(&req, config.trust_forwarded_proto);
            let mut session = SessionId::from_headers(req.headers(), &config.session_cookie);
            // only ids this server handed out name a session
            if !session.is_new && !api.has_session(&session.id) {
                debug!(session_id = %session.id, "Unknown session cookie, minting a new session");
                session = SessionId::mint();
            }
            let authorization = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if authorization.is_some() && config.require_secure_transport && !secure {
                warn!(
                    session_id = %session.id,
                    "Rejecting Authorization header over insecure transport"
                );
                let diagnostic = AuthError::InsecureTransport.diagnostic();
                let mut response = unauthorized_response(&[diagnostic]);
                insert_header(&mut response, WWW_AUTHENTICATE, render_error(&[diagnostic]));
                return Ok(response);
            }

            let request = AuthenticationRequest {
                session_id: session.id.clone(),
                authorization,
                request_params: query_params(req.uri().query()),
            };
            let mut result = api.authenticate(request).await;

            // a fresh login never continues under an id someone else may know
            if result.outcome.attempted && result.outcome.succeeded && !session.is_new {
                let rotated = SessionId::mint();
                if let Some(nonce) = api.rotate_session(&session.id, &rotated.id) {
                    debug!(session_id = %rotated.id, "Issued new session id after authentication");
                    result.session_id = rotated.id.clone();
                    result.server_nonce = nonce;
                    result.outcome.server_signature = None;
                    session = rotated;
                }
            }
            let diagnostics = result.outcome.diagnostics();

            let challenge = if result.requires_session {
                Some(render_challenge(
                    &result.session_id,
                    &result.server_nonce,
                    result.outcome.server_signature.as_ref(),
                    &diagnostics,
                ))
            } else {
                None
            };
            let set_cookie = (session.is_new && result.requires_session)
                .then(|| session.set_cookie(&config.session_cookie, secure));

            if result.outcome.is_failure() {
                debug!(session_id = %session.id, "Answering failed authentication with 401");
                let mut response = unauthorized_response(&diagnostics);
                let challenge = challenge.unwrap_or_else(|| render_error(&diagnostics));
                insert_header(&mut response, WWW_AUTHENTICATE, challenge);
                if let Some(cookie) = set_cookie {
                    insert_header(&mut response, SET_COOKIE, cookie);
                }
                return Ok(response);
            }

            req.extensions_mut().insert(result.outcome);
            let mut response = inner.call(req).await?;
            if let Some(challenge) = challenge {
                insert_header(&mut response, WWW_AUTHENTICATE, challenge);
            }
            if let Some(cookie) = set_cookie {
                insert_header(&mut response, SET_COOKIE, cookie);
            }
            Ok(response)
        })
    }
}

/// TLS-terminated here, or at a trusted proxy that says so.
fn is_secure<B>(req: &Request<B>, trust_forwarded_proto: bool) -> bool {
    if req.extensions().get::<SecureTransport>().is_some() {
        return true;
    }
    if req.uri().scheme() == Some(&Scheme::HTTPS) {
        return true;
    }
    trust_forwarded_proto
        && req
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// Query string pairs. An unparseable query contributes nothing.
fn query_params(query: Option<&str>) -> Vec<(String, String)> {
    let Some(query) = query else {
        return Vec::new();
    };
    serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        debug!(error = %e, "Ignoring unparseable query string");
        Vec::new()
    })
}

fn insert_header(response: &mut Response, name: HeaderName, value: String) {
    match HeaderValue::from_str(&value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(e) => warn!(header = %name, error = %e, "Dropping unrenderable response header"),
    }
}

/// Create unauthorized response
fn unauthorized_response(diagnostics: &[&str]) -> Response {
    let body = serde_json::json!({
        "error": "unauthorized",
        "diagnostics": diagnostics,
    });

    let mut response = Response::new(Body::from(serde_json::to_vec(&body).unwrap_or_default()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
