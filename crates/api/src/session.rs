//! Session token extractor.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::Response;

/// Header carrying the caller's session token, in both directions.
pub const SESSION_HEADER: &str = "x-session-token";

/// Longest token accepted from a client.
const MAX_TOKEN_LEN: usize = 128;

/// The caller's session token.
///
/// Taken from the `X-Session-Token` header. A missing, empty or oversized
/// header starts a new session under a freshly minted UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Echo the token on `response` so the caller can continue the session.
    pub fn attach(&self, response: &mut Response) {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty() && t.len() <= MAX_TOKEN_LEN);

        Ok(match supplied {
            Some(token) => SessionToken(token.to_string()),
            None => {
                let token = uuid::Uuid::new_v4().to_string();
                tracing::debug!(session = %token, "Starting new session");
                SessionToken(token)
            }
        })
    }
}
