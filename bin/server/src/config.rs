//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! `__` as separator, for example `AUTH__OAUTH_CLIENT_ID` or
//! `AUTH__PROVIDER_OPTS__ORGANIZATION`. `AUTH__USERS_WHITELIST` is a
//! comma-separated list.
//!
//! See [`AuthConfig`] for identity provider configuration.

use serde::Deserialize;
use tollgate_auth::AuthConfig;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Identity provider configuration.
    pub auth: AuthConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default())
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                environment
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.users_whitelist")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::load(config::Environment::default().source(Some(source)))
    }

    #[test]
    fn server_config_has_correct_defaults() {
        let config = load(&[
            ("AUTH__OAUTH_CLIENT_ID", "id"),
            ("AUTH__OAUTH_CLIENT_SECRET", "secret"),
        ])
        .expect("valid config");

        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert!(config.secure_cookies);
        assert_eq!(config.auth.provider(), "github");
        assert_eq!(config.auth.callback_url(), "");
        assert!(config.auth.whitelist().is_empty());
    }

    #[test]
    fn loads_provider_options_and_whitelist() {
        let config = load(&[
            ("LISTEN_ADDR", "0.0.0.0:8080"),
            ("SECURE_COOKIES", "false"),
            ("AUTH__PROVIDER", "google"),
            ("AUTH__OAUTH_CLIENT_ID", "id"),
            ("AUTH__OAUTH_CLIENT_SECRET", "secret"),
            ("AUTH__OAUTH_CALLBACK_URL", "https://ca.example.com/auth/callback"),
            ("AUTH__PROVIDER_OPTS__DOMAIN", "example.com"),
            ("AUTH__USERS_WHITELIST", "alice,bob"),
        ])
        .expect("valid config");

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(!config.secure_cookies);
        assert_eq!(config.auth.provider(), "google");
        assert_eq!(config.auth.provider_opt("domain"), Some("example.com"));
        assert!(config.auth.whitelist().contains("alice"));
        assert!(config.auth.whitelist().contains("bob"));
    }

    #[test]
    fn client_credentials_are_required() {
        assert!(load(&[("AUTH__PROVIDER", "github")]).is_err());
    }
}
