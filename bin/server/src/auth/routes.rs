//! Authentication routes for login, callback, and logout.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use oauth2::CsrfToken;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration;
use tollgate_auth::{AuthError, verify_state};

use super::AppState;

/// Auth state cookie name (for CSRF protection during the OAuth2 flow).
const AUTH_STATE_COOKIE: &str = "auth_state";

/// Query parameters for the OAuth2 callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: String,
    state: String,
}

/// Body returned once the user is authorized.
#[derive(Debug, Serialize, Deserialize)]
pub struct Authorized {
    pub provider: String,
    pub username: String,
}

fn request_host(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Starts the login flow by redirecting to the identity provider.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let csrf = CsrfToken::new_random();
    let session = state
        .provider
        .start_session(csrf.secret(), request_host(&headers));

    let cookie = Cookie::build((AUTH_STATE_COOKIE, session.state().to_string()))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(10));

    (jar.add(cookie), Redirect::to(session.auth_url()))
}

/// Handles the provider callback and applies the authorization policy.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, CallbackError> {
    let issued = jar
        .get(AUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(CallbackError::MissingAuthState)?;
    verify_state(&issued, &query.state)?;

    let token = state
        .provider
        .exchange(&query.code, request_host(&headers))
        .await?;

    let decision = state.provider.require_authorized(&token).await;
    if let Err(e) = state.provider.revoke(&token).await {
        tracing::warn!(error = %e.current_context(), "Failed to revoke provider token");
    }
    let username = decision?;

    tracing::info!(provider = state.provider.name(), username = %username, "User authorized");

    let body = Authorized {
        provider: state.provider.name().to_string(),
        username,
    };
    Ok((jar.add(removal(AUTH_STATE_COOKIE)), Json(body)))
}

/// Abandons any login in progress.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(removal(AUTH_STATE_COOKIE)), Redirect::to("/"))
}

/// Callback errors.
#[derive(Debug)]
pub enum CallbackError {
    MissingAuthState,
    Auth(AuthError),
}

impl From<Report<AuthError>> for CallbackError {
    fn from(report: Report<AuthError>) -> Self {
        Self::Auth(report.current_context().clone())
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingAuthState => (StatusCode::BAD_REQUEST, "Missing auth state"),
            Self::Auth(AuthError::StateMismatch) => {
                (StatusCode::BAD_REQUEST, "State parameter mismatch")
            }
            Self::Auth(AuthError::AuthorizationDenied { username }) => {
                tracing::warn!(username = %username, "Access denied");
                (
                    StatusCode::FORBIDDEN,
                    "Access denied - you are not authorized to obtain a certificate",
                )
            }
            Self::Auth(err @ (AuthError::Exchange { .. } | AuthError::MembershipCheck { .. })) => {
                tracing::error!(error = %err, "Could not verify identity");
                (StatusCode::BAD_GATEWAY, "Could not verify identity with the provider")
            }
            Self::Auth(err) => {
                tracing::error!(error = %err, "Authentication failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed")
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tollgate_auth::{Identity, Provider, Session, Token, Whitelist};
    use tower::ServiceExt;

    struct FakeProvider {
        username: &'static str,
        member: Result<bool, AuthError>,
        whitelist: Whitelist,
        revocations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn group(&self) -> &str {
            "staff"
        }

        fn whitelist(&self) -> &Whitelist {
            &self.whitelist
        }

        fn start_session(&self, state: &str, host: &str) -> Session {
            Session::new(
                format!("https://idp.example/authorize?state={state}&host={host}"),
                state.to_string(),
            )
        }

        async fn exchange(&self, code: &str, _host: &str) -> Result<Token, Report<AuthError>> {
            if code == "bad" {
                return Err(AuthError::Exchange {
                    reason: "invalid_grant".to_string(),
                }
                .into());
            }
            Ok(Token::new("access"))
        }

        async fn identify(&self, _token: &Token) -> Result<Identity, Report<AuthError>> {
            Ok(Identity::new(self.username))
        }

        async fn is_member(
            &self,
            _token: &Token,
            _identity: &Identity,
        ) -> Result<bool, Report<AuthError>> {
            self.member.clone().map_err(Report::from)
        }

        async fn revoke(&self, _token: &Token) -> Result<(), Report<AuthError>> {
            self.revocations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn lookup_failure() -> AuthError {
        AuthError::MembershipCheck {
            provider: "fake".to_string(),
            reason: "timeout".to_string(),
        }
    }

    fn test_app(
        member: Result<bool, AuthError>,
        whitelist: &[&str],
    ) -> (axum::Router, Arc<AtomicUsize>) {
        let revocations = Arc::new(AtomicUsize::new(0));
        let provider = FakeProvider {
            username: "alice",
            member,
            whitelist: Whitelist::new(whitelist.iter().copied()),
            revocations: revocations.clone(),
        };
        let state = Arc::new(AppState::new(Arc::new(provider), true));
        (router(state), revocations)
    }

    fn callback_request(code: &str, state: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .uri(format!("/auth/callback?code={code}&state={state}"))
            .header(header::HOST, "ca.example.com");
        if let Some(value) = cookie {
            builder = builder.header(header::COOKIE, format!("{AUTH_STATE_COOKIE}={value}"));
        }
        builder.body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn login_redirects_and_sets_state_cookie() {
        let (app, _) = test_app(Ok(true), &[]);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/login")
                    .header(header::HOST, "ca.example.com")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location");
        assert!(location.starts_with("https://idp.example/authorize?state="));
        assert!(location.ends_with("&host=ca.example.com"));

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("state cookie");
        assert!(cookie.starts_with(&format!("{AUTH_STATE_COOKIE}=")));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));

        let state = cookie
            .trim_start_matches(&format!("{AUTH_STATE_COOKIE}="))
            .split(';')
            .next()
            .expect("cookie value");
        assert!(!state.is_empty());
        assert!(location.contains(&format!("state={state}&")));
    }

    #[tokio::test]
    async fn member_is_authorized() {
        let (app, revocations) = test_app(Ok(true), &[]);
        let response = app
            .oneshot(callback_request("good", "xyz", Some("xyz")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let authorized: Authorized = serde_json::from_slice(&body).expect("json");
        assert_eq!(authorized.username, "alice");
        assert_eq!(authorized.provider, "fake");
        assert_eq!(revocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn whitelisted_user_is_authorized_when_lookup_fails() {
        let (app, _) = test_app(Err(lookup_failure()), &["alice"]);
        let response = app
            .oneshot(callback_request("good", "xyz", Some("xyz")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_member_is_forbidden() {
        let (app, revocations) = test_app(Ok(false), &[]);
        let response = app
            .oneshot(callback_request("good", "xyz", Some("xyz")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(revocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn membership_failure_is_bad_gateway() {
        let (app, _) = test_app(Err(lookup_failure()), &[]);
        let response = app
            .oneshot(callback_request("good", "xyz", Some("xyz")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn state_mismatch_is_rejected() {
        let (app, revocations) = test_app(Ok(true), &[]);
        let response = app
            .oneshot(callback_request("good", "xyz", Some("abc")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(revocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_state_cookie_is_rejected() {
        let (app, _) = test_app(Ok(true), &[]);
        let response = app
            .oneshot(callback_request("good", "xyz", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_exchange_is_bad_gateway() {
        let (app, _) = test_app(Ok(true), &[]);
        let response = app
            .oneshot(callback_request("bad", "xyz", Some("xyz")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn logout_clears_state_cookie() {
        let (app, _) = test_app(Ok(true), &[]);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/logout")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("removal cookie");
        assert!(cookie.starts_with(&format!("{AUTH_STATE_COOKIE}=;")));
        assert!(cookie.contains("Max-Age=0"));
    }
}
