//! tollgate login server.
//!
//! This crate wires a configured identity provider into HTTP endpoints:
//! `/auth/login` starts the OAuth2 flow, `/auth/callback` applies the
//! authorization policy and reports the authorized username, and
//! `/auth/logout` abandons a login in progress.

pub mod auth;
pub mod config;

use auth::AppState;
use axum::{Router, routing::get};
use std::sync::Arc;
use tollgate_auth::oauth::DEFAULT_CALLBACK_PATH;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", get(auth::login))
        .route(DEFAULT_CALLBACK_PATH, get(auth::callback))
        .route("/auth/logout", get(auth::logout))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tollgate_auth::{AuthConfig, ProviderRegistry};
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_reports_ok() {
        let config = AuthConfig::new("id", "secret").with_provider_opt("organization", "exampleorg");
        let provider = ProviderRegistry::with_defaults()
            .build(&config)
            .expect("github provider");
        let app = router(Arc::new(AppState::new(provider, false)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], b"ok");
    }
}
