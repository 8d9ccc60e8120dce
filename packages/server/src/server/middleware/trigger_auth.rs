use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::server::error::ApiError;

/// Header carried by trusted internal callers (cron, other services).
pub const INTERNAL_CALL_HEADER: &str = "x-internal-call";

/// Credentials accepted on the trigger route.
#[derive(Debug, Clone)]
pub struct TriggerAuth {
    pub internal_call_secret: String,
    pub admin_api_token: String,
}

impl TriggerAuth {
    pub fn new(internal_call_secret: impl Into<String>, admin_api_token: impl Into<String>) -> Self {
        Self {
            internal_call_secret: internal_call_secret.into(),
            admin_api_token: admin_api_token.into(),
        }
    }

    /// Accept either the internal-call marker or an admin bearer token.
    /// Empty configured secrets never match.
    pub fn authorizes(&self, headers: &HeaderMap) -> bool {
        let internal = headers
            .get(INTERNAL_CALL_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| !self.internal_call_secret.is_empty() && v == self.internal_call_secret);
        if internal {
            debug!("Trigger authorized by internal call header");
            return true;
        }

        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| !self.admin_api_token.is_empty() && token == self.admin_api_token);
        if bearer {
            debug!("Trigger authorized by admin token");
        }
        bearer
    }
}

/// Reject unauthenticated calls to the trigger route with 401.
pub async fn require_internal_or_admin(
    State(auth): State<Arc<TriggerAuth>>,
    request: Request,
    next: Next,
) -> Response {
    if !auth.authorizes(request.headers()) {
        warn!(path = %request.uri().path(), "Unauthorized trigger call");
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth() -> TriggerAuth {
        TriggerAuth::new("internal-secret", "admin-token")
    }

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_internal_header_accepted() {
        assert!(auth().authorizes(&headers(INTERNAL_CALL_HEADER, "internal-secret")));
        assert!(!auth().authorizes(&headers(INTERNAL_CALL_HEADER, "true")));
    }

    #[test]
    fn test_admin_bearer_accepted() {
        assert!(auth().authorizes(&headers("authorization", "Bearer admin-token")));
        assert!(!auth().authorizes(&headers("authorization", "admin-token")));
        assert!(!auth().authorizes(&headers("authorization", "Bearer internal-secret")));
    }

    #[test]
    fn test_no_credentials_rejected() {
        assert!(!auth().authorizes(&HeaderMap::new()));
    }

    #[test]
    fn test_empty_secret_never_matches() {
        let auth = TriggerAuth::new("", "");
        assert!(!auth.authorizes(&headers(INTERNAL_CALL_HEADER, "")));
        assert!(!auth.authorizes(&headers("authorization", "Bearer ")));
    }
}
