//! Authenticated principal extraction.
//!
//! Flow Overview: read the `Authorization: Basic` header, decode
//! `username:password`, verify it through the [`AuthGate`], and hand the
//! resulting principal to the handler. Every failure looks the same to the
//! caller.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};
use secrecy::SecretString;
use tracing::debug;

use super::AuthGate;
use crate::api::handlers::ApiError;

/// Authenticated identity for the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

/// Credentials decoded from an `Authorization: Basic` header.
#[derive(Debug)]
pub struct BasicCredentials {
    pub username: String,
    pub password: SecretString,
}

impl BasicCredentials {
    /// Decode the `Authorization` header; `None` when absent or malformed.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = Base64::decode_vec(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        // No registered username can hold NUL, and PostgreSQL TEXT rejects it.
        if username.is_empty() || username.contains('\0') {
            return None;
        }

        Some(Self {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
        })
    }
}

/// Resolve Basic credentials into a principal, or return the uniform 401.
///
/// # Errors
/// [`ApiError::Unauthenticated`] for any credential problem,
/// [`ApiError::Internal`] if the credential store fails.
pub async fn require_auth(headers: &HeaderMap, gate: &AuthGate) -> Result<Principal, ApiError> {
    let Some(credentials) = BasicCredentials::from_headers(headers) else {
        debug!("Missing or malformed Authorization header");
        return Err(ApiError::Unauthenticated);
    };

    match gate.verify(&credentials).await? {
        Some(principal) => Ok(principal),
        None => {
            debug!("Credentials rejected");
            Err(ApiError::Unauthenticated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::ExposeSecret;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    fn basic(raw: &str) -> String {
        format!("Basic {}", Base64::encode_string(raw.as_bytes()))
    }

    #[test]
    fn decodes_username_and_password() {
        let credentials = BasicCredentials::from_headers(&headers_with(&basic("alice:pw1")));
        let Some(credentials) = credentials else {
            panic!("expected credentials");
        };
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "pw1");
    }

    #[test]
    fn password_may_contain_colons() {
        let credentials = BasicCredentials::from_headers(&headers_with(&basic("bob:a:b:c")));
        assert_eq!(
            credentials.map(|c| c.password.expose_secret().to_string()),
            Some("a:b:c".to_string())
        );
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let header = format!("bAsIc {}", Base64::encode_string(b"alice:pw1"));
        assert!(BasicCredentials::from_headers(&headers_with(&header)).is_some());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert!(BasicCredentials::from_headers(&HeaderMap::new()).is_none());
        assert!(BasicCredentials::from_headers(&headers_with("Bearer abc")).is_none());
        assert!(BasicCredentials::from_headers(&headers_with("Basic")).is_none());
        assert!(BasicCredentials::from_headers(&headers_with("Basic %%%")).is_none());
        assert!(BasicCredentials::from_headers(&headers_with(&basic("no-colon"))).is_none());
        assert!(BasicCredentials::from_headers(&headers_with(&basic(":pw"))).is_none());
        assert!(BasicCredentials::from_headers(&headers_with(&basic("al\0ice:pw"))).is_none());

        let not_utf8 = format!("Basic {}", Base64::encode_string(&[0xff, 0xfe, b':', b'x']));
        assert!(BasicCredentials::from_headers(&headers_with(&not_utf8)).is_none());
    }

    #[test]
    fn debug_output_redacts_password() {
        let credentials = BasicCredentials::from_headers(&headers_with(&basic("alice:hunter2")));
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
