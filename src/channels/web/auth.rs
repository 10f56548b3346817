//! Bearer token authentication middleware for the dashboard.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

/// Cookie the browser UI may carry instead of an `Authorization` header.
pub const SESSION_COOKIE: &str = "vault_chat_session";

/// Shared auth state injected via axum middleware state.
#[derive(Clone)]
pub struct AuthState {
    pub token: String,
}

impl AuthState {
    pub fn is_valid(&self, candidate: &str) -> bool {
        bool::from(candidate.as_bytes().ct_eq(self.token.as_bytes()))
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        if let Some(auth_header) = headers.get("authorization")
            && let Ok(value) = auth_header.to_str()
            && let Some(token) = value.strip_prefix("Bearer ")
            && self.is_valid(token)
        {
            return true;
        }

        if let Some(cookie_header) = headers.get("cookie")
            && let Ok(cookie_str) = cookie_header.to_str()
        {
            let prefix = format!("{SESSION_COOKIE}=");
            return cookie_str
                .split(';')
                .filter_map(|pair| pair.trim().strip_prefix(prefix.as_str()))
                .any(|token| self.is_valid(token));
        }

        false
    }
}

/// Auth middleware that validates the bearer token from header or session cookie.
///
/// Query-parameter auth is rejected so the token never lands in URLs or logs.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if auth.is_authorized(&headers) {
        return next.run(request).await;
    }

    (StatusCode::UNAUTHORIZED, "Invalid or missing auth token").into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn state() -> AuthState {
        AuthState {
            token: "s3cret".to_string(),
        }
    }

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn bearer_header() {
        assert!(state().is_authorized(&headers("authorization", "Bearer s3cret")));
        assert!(!state().is_authorized(&headers("authorization", "Bearer nope")));
        assert!(!state().is_authorized(&headers("authorization", "s3cret")));
    }

    #[test]
    fn session_cookie() {
        assert!(state().is_authorized(&headers("cookie", "theme=dark; vault_chat_session=s3cret")));
        assert!(!state().is_authorized(&headers("cookie", "other_session=s3cret")));
    }

    #[test]
    fn nothing_presented() {
        assert!(!state().is_authorized(&HeaderMap::new()));
    }
}
