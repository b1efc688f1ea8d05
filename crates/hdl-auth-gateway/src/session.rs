//! Session id from the session cookie.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use uuid::Uuid;

/// Session carrying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    pub id: String,
    /// Minted for this request; the client has not seen it yet
    pub is_new: bool,
}

impl SessionId {
    /// Read `cookie_name` from the request, or mint a new uuid v4.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        match find_cookie(headers, cookie_name) {
            Some(id) => Self { id, is_new: false },
            None => Self::mint(),
        }
    }

    /// A fresh server-chosen id.
    pub fn mint() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_new: true,
        }
    }

    /// `Set-Cookie` value handing this session to the client.
    pub fn set_cookie(&self, cookie_name: &str, secure: bool) -> String {
        let mut cookie = format!("{cookie_name}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// First non-empty value of `name` across every `Cookie` header.
fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.trim_matches('"').to_string())
}
