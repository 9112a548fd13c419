//! Login endpoints for the tollgate server.
//!
//! The server holds no session store. The OAuth2 state issued on login is
//! kept in a short-lived HTTP-only cookie and checked on the callback. The
//! provider token is revoked as soon as the authorization decision is made.

pub mod routes;

use std::sync::Arc;
use tollgate_auth::Provider;

pub use routes::{callback, login, logout};

/// Shared application state.
pub struct AppState {
    /// Identity provider built from configuration.
    pub provider: Arc<dyn Provider>,
    /// Whether cookies carry the Secure flag.
    pub secure_cookies: bool,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(provider: Arc<dyn Provider>, secure_cookies: bool) -> Self {
        Self {
            provider,
            secure_cookies,
        }
    }
}
