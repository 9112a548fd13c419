//! Identity provider configuration.
//!
//! `AuthConfig` is the input handed over by whatever loads the service
//! configuration. It is validated once, when a provider is built from it.

use crate::error::AuthError;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tollgate_core::Whitelist;

/// Configuration for one identity provider instance.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Registry name of the provider to build ("github" or "google").
    /// Default: "github"
    #[serde(default = "default_provider")]
    provider: String,
    /// The OAuth2 client ID registered with the provider.
    oauth_client_id: String,
    /// The OAuth2 client secret.
    oauth_client_secret: String,
    /// Callback URL registered with the provider. May be absolute, a path
    /// relative to the request host, or empty to use `/auth/callback`.
    #[serde(default)]
    oauth_callback_url: String,
    /// Provider-specific options such as `organization` or `domain`.
    #[serde(default)]
    provider_opts: HashMap<String, String>,
    /// Usernames authorized regardless of group membership.
    #[serde(default)]
    users_whitelist: Whitelist,
    /// Timeout applied to each request made to the provider.
    /// Default: 10
    #[serde(default = "default_http_timeout_seconds")]
    http_timeout_seconds: u64,
}

fn default_provider() -> String {
    "github".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    10
}

impl AuthConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(oauth_client_id: impl Into<String>, oauth_client_secret: impl Into<String>) -> Self {
        Self {
            provider: default_provider(),
            oauth_client_id: oauth_client_id.into(),
            oauth_client_secret: oauth_client_secret.into(),
            oauth_callback_url: String::new(),
            provider_opts: HashMap::new(),
            users_whitelist: Whitelist::default(),
            http_timeout_seconds: default_http_timeout_seconds(),
        }
    }

    /// Sets the registry name of the provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Sets the callback URL.
    #[must_use]
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.oauth_callback_url = url.into();
        self
    }

    /// Sets a single provider option, replacing any previous value.
    #[must_use]
    pub fn with_provider_opt(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.provider_opts.insert(key.into(), value.into());
        self
    }

    /// Replaces the user whitelist.
    #[must_use]
    pub fn with_whitelist<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users_whitelist = Whitelist::new(users);
        self
    }

    /// Sets the per-request HTTP timeout.
    #[must_use]
    pub fn with_http_timeout_seconds(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    /// Returns the registry name of the provider.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.oauth_client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.oauth_client_secret
    }

    /// Returns the configured callback URL, possibly relative or empty.
    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.oauth_callback_url
    }

    /// Returns a provider option by key.
    #[must_use]
    pub fn provider_opt(&self, key: &str) -> Option<&str> {
        self.provider_opts.get(key).map(String::as_str)
    }

    /// Returns the user whitelist.
    #[must_use]
    pub fn whitelist(&self) -> &Whitelist {
        &self.users_whitelist
    }

    /// Returns the per-request HTTP timeout.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Returns the provider option `key`, failing if it is absent or blank.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when the option is missing or
    /// empty. A whitelist does not relax this requirement.
    pub fn required_opt(&self, key: &str) -> Result<String, Report<AuthError>> {
        match self.provider_opt(key).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(AuthError::configuration(format!(
                "provider option '{key}' must be set for the {} provider",
                self.provider
            ))
            .into()),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("provider", &self.provider)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_client_secret", &"<redacted>")
            .field("oauth_callback_url", &self.oauth_callback_url)
            .field("provider_opts", &self.provider_opts)
            .field("users_whitelist", &self.users_whitelist)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish()
    }
}
