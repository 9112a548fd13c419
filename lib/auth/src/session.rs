//! Login sessions for the OAuth2 authorization-code flow.
//!
//! A [`Session`] is issued per login attempt. The caller redirects the user
//! to [`Session::auth_url`], keeps the state somewhere it controls (cookie,
//! signed token, memory) and checks the value echoed on the callback with
//! [`Session::verify_state`] before exchanging the code.
//!
//! The state must come from a cryptographically secure source such as
//! `oauth2::CsrfToken::new_random`. A guessable state defeats the CSRF
//! protection this flow relies on.

use crate::error::AuthError;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Authorization redirect issued for one login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    auth_url: String,
    state: String,
}

impl Session {
    /// Creates a session from a built authorization URL and its state.
    #[must_use]
    pub fn new(auth_url: String, state: String) -> Self {
        Self { auth_url, state }
    }

    /// Returns the URL to redirect the user to.
    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Returns the state embedded in the authorization URL.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Checks the state returned on the callback against the issued one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::StateMismatch` unless the values are identical.
    pub fn verify_state(&self, returned: &str) -> Result<(), Report<AuthError>> {
        verify_state(&self.state, returned)
    }
}

/// Compares an issued state with the one echoed back by the provider.
///
/// Comparison is exact and constant-time. An empty issued state never
/// matches.
///
/// # Errors
///
/// Returns `AuthError::StateMismatch` when the values differ.
pub fn verify_state(issued: &str, returned: &str) -> Result<(), Report<AuthError>> {
    if issued.is_empty() || !bool::from(issued.as_bytes().ct_eq(returned.as_bytes())) {
        tracing::warn!("oauth state mismatch on callback");
        return Err(AuthError::StateMismatch.into());
    }
    Ok(())
}
