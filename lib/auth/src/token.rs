//! Access tokens obtained from a provider's token endpoint.

use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use std::fmt;
use std::time::Duration;

/// Result of exchanging an authorization code.
///
/// The secret is never printed by `Debug`.
#[derive(Clone)]
pub struct Token {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<Duration>,
    scopes: Vec<String>,
}

impl Token {
    /// Creates a token from a raw access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            scopes: Vec::new(),
        }
    }

    /// Returns the bearer secret.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if the provider issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns the lifetime reported by the provider.
    #[must_use]
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }

    /// Returns the scopes the provider actually granted.
    ///
    /// GitHub reports scopes comma-separated; they are split the same way
    /// as space-separated ones.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl From<BasicTokenResponse> for Token {
    fn from(response: BasicTokenResponse) -> Self {
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in(),
            scopes: response
                .scopes()
                .map(|scopes| {
                    scopes
                        .iter()
                        .flat_map(|s| s.split(','))
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scopes", &self.scopes)
            .finish()
    }
}
