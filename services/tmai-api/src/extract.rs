//! Credential extraction from request headers.

use axum::http::{header, HeaderMap};

use tmai_core::{CoreError, CoreResult, SessionIdentity, SECRET_PREFIX};

use crate::state::AppState;

/// Header carrying an API key secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying a first-party session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Extracts a presented API key secret from request headers.
///
/// `x-api-key` is checked first; `Authorization: Bearer` is the fallback
/// and only consumed when the token carries the key prefix, so session
/// bearer tokens are left for other layers.
#[must_use]
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER) {
        if let Ok(key) = value.to_str() {
            return Some(key.to_string());
        }
    }

    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth) = value.to_str() {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                if token.starts_with(SECRET_PREFIX) {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Extracts a presented session token from request headers.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Resolves the request's session to an identity, or fails with
/// `Unauthenticated`.
pub async fn require_session(state: &AppState, headers: &HeaderMap) -> CoreResult<SessionIdentity> {
    let token = extract_session_token(headers)
        .ok_or_else(|| CoreError::unauthenticated("missing session token"))?;
    state
        .sessions
        .verify(&token)
        .await?
        .ok_or_else(|| CoreError::unauthenticated("invalid or expired session"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_header_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, "tmai_from-header".parse().unwrap());
        headers.insert(
            header::AUTHORIZATION,
            "Bearer tmai_from-bearer".parse().unwrap(),
        );
        assert_eq!(extract_api_key(&headers).as_deref(), Some("tmai_from-header"));
    }

    #[test]
    fn bearer_without_the_key_prefix_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer some-jwt".parse().unwrap());
        assert_eq!(extract_api_key(&headers), None);
    }

    #[test]
    fn bearer_with_the_key_prefix_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            "Bearer tmai_bearer-secret".parse().unwrap(),
        );
        assert_eq!(extract_api_key(&headers).as_deref(), Some("tmai_bearer-secret"));
    }

    #[test]
    fn session_token_comes_from_its_own_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_TOKEN_HEADER, "sess-123".parse().unwrap());
        assert_eq!(extract_session_token(&headers).as_deref(), Some("sess-123"));
    }
}
