//! Caller identity extraction from the edge-carried token header.
//!
//! The token's signature is **not** verified here — the edge gateway in
//! front of this service has already validated it, and this layer only
//! unpacks the claim payload. [`UnverifiedUser`] carries that assumption
//! in its name so downstream code cannot mistake it for a checked
//! identity.

use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::warn;

/// Identity used when no token header is present, or when the token
/// payload cannot be decoded.
pub const ANONYMOUS: &str = "anonymous";

/// A caller name taken from an unverified token claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedUser {
    pub name: String,
}

impl UnverifiedUser {
    fn anonymous() -> Self {
        Self { name: ANONYMOUS.to_string() }
    }
}

/// Extract the caller identity from `headers`.
///
/// Reads the `preferred_username` claim out of the token carried in
/// `header_name`. A missing header yields [`ANONYMOUS`]; a malformed token
/// or missing claim degrades to [`ANONYMOUS`] with a warning rather than
/// failing the request.
pub fn identify(headers: &HeaderMap, header_name: &str) -> UnverifiedUser {
    let Some(raw) = headers.get(header_name).and_then(|v| v.to_str().ok()) else {
        return UnverifiedUser::anonymous();
    };

    match preferred_username(raw) {
        Some(name) => UnverifiedUser { name },
        None => {
            warn!(header = header_name, "identity token present but unreadable");
            UnverifiedUser::anonymous()
        }
    }
}

/// Decode the payload segment of `token` and read `preferred_username`.
fn preferred_username(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("preferred_username")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const HEADER: &str = "x-identity-token";

    /// Assemble an unsigned token with the given payload claims.
    fn forge_token(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(b"signature");
        format!("{header}.{payload}.{signature}")
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER, HeaderValue::from_str(token).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        let user = identify(&HeaderMap::new(), HEADER);
        assert_eq!(user.name, ANONYMOUS);
    }

    #[test]
    fn preferred_username_claim_is_extracted() {
        let token = forge_token(&serde_json::json!({ "preferred_username": "alice" }));
        let user = identify(&headers_with(&token), HEADER);
        assert_eq!(user.name, "alice");
    }

    #[test]
    fn garbage_token_degrades_to_anonymous() {
        let user = identify(&headers_with("not-a-token"), HEADER);
        assert_eq!(user.name, ANONYMOUS);
    }

    #[test]
    fn missing_claim_degrades_to_anonymous() {
        let token = forge_token(&serde_json::json!({ "sub": "subject-only" }));
        let user = identify(&headers_with(&token), HEADER);
        assert_eq!(user.name, ANONYMOUS);
    }

    #[test]
    fn undecodable_payload_degrades_to_anonymous() {
        let user = identify(&headers_with("aGVhZGVy.!!!.c2ln"), HEADER);
        assert_eq!(user.name, ANONYMOUS);
    }
}
