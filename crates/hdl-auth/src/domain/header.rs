//! # Authorization Header Codec
//!
//! Parses and renders `Authorization: Handle name=value, ...`.
//!
//! ## Grammar
//!
//! ```text
//! header = scheme 1*WS param-list
//! param-list = *( OWS "," ) param *( OWS "," OWS param ) *( OWS "," )
//! param = name OWS "=" OWS ( token / quoted-string )
//! ```
//!
//! Parameter names are case-insensitive. Values are taken literally after
//! quoted-string unescaping, except `id` which is also percent-decoded.
//! Unknown names are kept so newer clients keep parsing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hdl_types::{split_index_prefix, IdentityRef};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Authentication scheme keyword.
pub const SCHEME: &str = "Handle";

/// Scheme keyword of the Basic fallback.
pub const BASIC_SCHEME: &str = "Basic";

/// Recognized parameter names, lowercased.
pub mod names {
    pub const VERSION: &str = "version";
    pub const SESSION_ID: &str = "sessionid";
    pub const ID: &str = "id";
    pub const CNONCE: &str = "cnonce";
    pub const TYPE: &str = "type";
    pub const ALG: &str = "alg";
    pub const SIGNATURE: &str = "signature";
    pub const SALT: &str = "salt";
    pub const ITERATIONS: &str = "iterations";
    pub const LENGTH: &str = "length";
    pub const CLIENT_CERT: &str = "clientcert";
    pub const RENEGOTIATE: &str = "renegotiate";
}

/// (lowercase, canonical spelling) for every recognized name.
const KNOWN_NAMES: [(&str, &str); 12] = [
    (names::VERSION, "version"),
    (names::SESSION_ID, "sessionId"),
    (names::ID, "id"),
    (names::CNONCE, "cnonce"),
    (names::TYPE, "type"),
    (names::ALG, "alg"),
    (names::SIGNATURE, "signature"),
    (names::SALT, "salt"),
    (names::ITERATIONS, "iterations"),
    (names::LENGTH, "length"),
    (names::CLIENT_CERT, "clientCert"),
    (names::RENEGOTIATE, "renegotiate"),
];

/// Value substituted for flags given with an empty value.
pub const FLAG_TRUE: &str = "true";

const ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// =============================================================================
// PARSED PARAMETERS
// =============================================================================

/// Structured parameter set from an Authorization header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthParams {
    params: BTreeMap<String, String>,
}

impl AuthParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter; the name is matched case-insensitively.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.params.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in name order, names lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn version(&self) -> Option<&str> {
        self.get(names::VERSION)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.get(names::SESSION_ID)
    }

    pub fn id(&self) -> Option<&str> {
        self.get(names::ID)
    }

    pub fn cnonce(&self) -> Option<&str> {
        self.get(names::CNONCE)
    }

    pub fn credential_type(&self) -> Option<&str> {
        self.get(names::TYPE)
    }

    pub fn alg(&self) -> Option<&str> {
        self.get(names::ALG)
    }

    pub fn signature(&self) -> Option<&str> {
        self.get(names::SIGNATURE)
    }

    pub fn salt(&self) -> Option<&str> {
        self.get(names::SALT)
    }

    pub fn iterations(&self) -> Option<&str> {
        self.get(names::ITERATIONS)
    }

    pub fn length(&self) -> Option<&str> {
        self.get(names::LENGTH)
    }

    pub fn client_cert(&self) -> Option<&str> {
        self.get(names::CLIENT_CERT)
    }

    pub fn renegotiate(&self) -> Option<&str> {
        self.get(names::RENEGOTIATE)
    }

    /// Claims an identity: any of id, type, alg or signature is present.
    pub fn is_authenticating(&self) -> bool {
        [names::ID, names::TYPE, names::ALG, names::SIGNATURE]
            .iter()
            .any(|n| self.contains(n))
    }

    /// Asks for a mutual-authentication signature without claiming an identity.
    pub fn is_requesting_server_signature(&self) -> bool {
        self.contains(names::CNONCE) && !self.contains(names::ID)
    }

    /// Needs per-session state to be answered.
    pub fn requires_session(&self) -> bool {
        self.contains(names::SESSION_ID)
            || self.is_authenticating()
            || self.is_requesting_server_signature()
    }

    /// Authenticating but missing one of id, cnonce, type, alg, signature.
    pub fn is_incomplete_authentication(&self) -> bool {
        self.is_authenticating() && self.missing_required().is_some()
    }

    /// First required authentication field that is absent.
    pub fn missing_required(&self) -> Option<&'static str> {
        [
            names::ID,
            names::CNONCE,
            names::TYPE,
            names::ALG,
            names::SIGNATURE,
        ]
        .into_iter()
        .find(|n| !self.contains(n))
    }

    fn normalize_flags(&mut self) {
        for value in self.params.values_mut() {
            if value.is_empty() {
                *value = FLAG_TRUE.to_string();
            }
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a raw header value.
///
/// Returns `None` for another scheme, a syntax error, or an empty parameter list.
pub fn parse(raw: &str) -> Option<AuthParams> {
    let raw = raw.trim();
    let split = raw.find(|c: char| c.is_ascii_whitespace())?;
    let (scheme, rest) = raw.split_at(split);
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return None;
    }
    let params = parse_params(rest)?;
    if params.is_empty() {
        return None;
    }
    Some(params)
}

/// Merge header parameters with same-named request parameters.
///
/// Header values win. Only recognized names are taken from the request, and
/// empty values on either side become [`FLAG_TRUE`].
pub fn merge<'a, I>(header: Option<AuthParams>, request: I) -> AuthParams
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut merged = header.unwrap_or_default();
    for (name, value) in request {
        if is_known(name) && !merged.contains(name) {
            merged.insert(name, value);
        }
    }
    merged.normalize_flags();
    merged
}

fn is_known(name: &str) -> bool {
    KNOWN_NAMES
        .iter()
        .any(|(lower, _)| name.eq_ignore_ascii_case(lower))
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(is_ws) {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self) {
        while self.peek().is_some_and(|b| b == b',' || is_ws(b)) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Read a quoted string starting at the opening quote.
    fn quoted(&mut self) -> Option<String> {
        self.pos += 1;
        let mut out = String::new();
        let mut escaped = false;
        for (i, c) in self.src[self.pos..].char_indices() {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' => {
                    self.pos += i + 1;
                    return Some(out);
                }
                _ => out.push(c),
            }
        }
        // unterminated
        None
    }
}

fn parse_params(input: &str) -> Option<AuthParams> {
    let mut cur = Cursor { src: input, pos: 0 };
    let mut params = AuthParams::new();

    loop {
        cur.skip_separators();
        if cur.peek().is_none() {
            break;
        }

        let name = cur.take_while(|b| b != b'=' && b != b',' && !is_ws(b));
        if name.is_empty() {
            return None;
        }
        cur.skip_ws();
        if cur.peek() != Some(b'=') {
            return None;
        }
        cur.pos += 1;
        cur.skip_ws();

        let value = if cur.peek() == Some(b'"') {
            cur.quoted()?
        } else {
            cur.take_while(|b| b != b',' && !is_ws(b)).to_string()
        };

        cur.skip_ws();
        if !matches!(cur.peek(), None | Some(b',')) {
            return None;
        }

        let value = if name.eq_ignore_ascii_case(names::ID) {
            percent_decode_str(&value).decode_utf8_lossy().into_owned()
        } else {
            value
        };
        params.insert(name, value);
    }

    Some(params)
}

// =============================================================================
// RENDERING
// =============================================================================

/// Render a full header value. Every value is quoted; `id` is percent-encoded.
pub fn serialize(params: &AuthParams) -> String {
    let mut out = String::from(SCHEME);
    for (i, (name, value)) in params.iter().enumerate() {
        out.push_str(if i == 0 { " " } else { ", " });
        out.push_str(canonical_name(name));
        out.push('=');
        if name == names::ID {
            push_quoted(&mut out, &utf8_percent_encode(value, ID_ENCODE_SET).to_string());
        } else {
            push_quoted(&mut out, value);
        }
    }
    out
}

fn canonical_name(name: &str) -> &str {
    KNOWN_NAMES
        .iter()
        .find(|(lower, _)| *lower == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// Append `value` as a quoted-string.
pub fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

// =============================================================================
// BASIC CREDENTIALS
// =============================================================================

/// Credentials carried by `Authorization: Basic`.
///
/// The username is `[index:]handle`; the password is the raw shared secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub identity: IdentityRef,
    pub password: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Parse an `Authorization: Basic` value.
///
/// The decoded text is `[index:]handle:password`. After the optional index
/// prefix, the handle runs to the next `:` and the password is the rest, so
/// passwords may contain colons but handles may not.
pub fn parse_basic(raw: &str) -> Option<BasicCredentials> {
    let raw = raw.trim();
    let split = raw.find(|c: char| c.is_ascii_whitespace())?;
    let (scheme, encoded) = raw.split_at(split);
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return None;
    }
    let decoded = Zeroizing::new(BASE64.decode(encoded.trim()).ok()?);
    let text = std::str::from_utf8(&decoded).ok()?;

    let (index, rest) = split_index_prefix(text).ok()?;
    let (handle, password) = rest.split_once(':')?;
    if handle.is_empty() {
        return None;
    }
    Some(BasicCredentials {
        identity: IdentityRef::new(handle, index),
        password: Zeroizing::new(password.as_bytes().to_vec()),
    })
}
