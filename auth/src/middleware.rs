//! Axum middleware enforcing the `auth-key` header, grounded in the
//! original router's `APIKeyHeader`-based dependency.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    audit::{AuditEvent, AuditLogger, AuditOutcome},
    config::AuthConfig,
};

/// The authenticated caller, attached to request extensions by
/// [`api_key_auth_middleware`] and readable downstream via
/// [`PrincipalExt::principal`].
#[derive(Debug, Clone)]
pub struct Principal(pub String);

pub trait PrincipalExt {
    fn principal(&self) -> Option<&str>;
}

impl PrincipalExt for Request {
    fn principal(&self) -> Option<&str> {
        self.extensions().get::<Principal>().map(|p| p.0.as_str())
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AuthConfig>,
    pub audit: Arc<AuditLogger>,
}

pub async fn api_key_auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let presented = req
        .headers()
        .get("auth-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(presented) = presented else {
        state.audit.record(AuditEvent {
            timestamp: Utc::now(),
            principal: None,
            path,
            outcome: AuditOutcome::Denied,
        });
        return (StatusCode::UNAUTHORIZED, "missing auth-key header").into_response();
    };

    match state.config.authenticate(&presented) {
        Some(principal) => {
            state.audit.record(AuditEvent {
                timestamp: Utc::now(),
                principal: Some(principal.to_string()),
                path,
                outcome: AuditOutcome::Allowed,
            });
            req.extensions_mut().insert(Principal(principal.to_string()));
            next.run(req).await
        }
        None => {
            state.audit.record(AuditEvent {
                timestamp: Utc::now(),
                principal: None,
                path,
                outcome: AuditOutcome::Denied,
            });
            (StatusCode::UNAUTHORIZED, "invalid api key").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    fn test_state() -> AuthState {
        AuthState {
            config: Arc::new(AuthConfig::single_key("secret")),
            audit: Arc::new(AuditLogger::default()),
        }
    }

    #[tokio::test]
    async fn rejects_request_missing_the_key_header() {
        let state = test_state();
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                api_key_auth_middleware,
            ));
        let resp = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_request_with_matching_key() {
        let state = test_state();
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                api_key_auth_middleware,
            ));
        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("auth-key", "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
