//! `WWW-Authenticate: Handle ...` rendering.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hdl_auth::domain::header::{push_quoted, SCHEME};
use hdl_auth::ServerSignature;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes escaped inside the `error` parameter. Non-ASCII is always escaped.
const ERROR_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'%').add(b'"').add(b'\\');

/// Render the challenge returned with every authentication-capable response.
///
/// `serverAlg`/`serverSignature` appear only with a signature; `error` only
/// when `errors` is non-empty, joined by `"; "`.
pub fn render_challenge(
    session_id: &str,
    nonce: &[u8],
    server_signature: Option<&ServerSignature>,
    errors: &[&str],
) -> String {
    let mut out = format!("{SCHEME} sessionId=");
    push_quoted(&mut out, session_id);
    out.push_str(", nonce=");
    push_quoted(&mut out, &BASE64.encode(nonce));

    if let Some(signature) = server_signature {
        out.push_str(", serverAlg=");
        push_quoted(&mut out, &signature.algorithm);
        out.push_str(", serverSignature=");
        push_quoted(&mut out, &BASE64.encode(&signature.bytes));
    }

    if !errors.is_empty() {
        out.push_str(", ");
        push_error(&mut out, &errors.join("; "));
    }
    out
}

/// Challenge carrying only an error, for requests rejected before any
/// session state was consulted.
pub fn render_error(errors: &[&str]) -> String {
    let mut out = format!("{SCHEME} ");
    push_error(&mut out, &errors.join("; "));
    out
}

fn push_error(out: &mut String, message: &str) {
    out.push_str("error=");
    push_quoted(out, &utf8_percent_encode(message, ERROR_ENCODE_SET).to_string());
}
