//! Name-to-constructor registry for providers.
//!
//! The registry is an ordinary value built at startup and passed to whoever
//! needs to construct a provider.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::provider::Provider;
use crate::{github, google};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds a provider from configuration.
pub type ProviderConstructor =
    fn(&AuthConfig) -> tollgate_core::Result<Arc<dyn Provider>, AuthError>;

/// Maps provider names to their constructors.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in `github` and `google` providers.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .register(github::NAME, github::GithubProvider::boxed)
            .register(google::NAME, google::GoogleProvider::boxed)
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, constructor: ProviderConstructor) -> Self {
        self.constructors.insert(name.into(), constructor);
        self
    }

    /// Registered provider names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the provider selected by `config.provider()`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownProvider` when no constructor is registered
    /// under the configured name, or the constructor's own error.
    pub fn build(
        &self,
        config: &AuthConfig,
    ) -> tollgate_core::Result<Arc<dyn Provider>, AuthError> {
        let constructor =
            self.constructors
                .get(config.provider())
                .ok_or_else(|| AuthError::UnknownProvider {
                    name: config.provider().to_string(),
                })?;

        debug!(provider = config.provider(), "building auth provider");
        constructor(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Identity;
    use crate::session::Session;
    use crate::token::Token;
    use async_trait::async_trait;
    use rootcause::prelude::Report;
    use tollgate_core::Whitelist;

    struct StaticProvider {
        whitelist: Whitelist,
    }

    #[async_trait]
    impl Provider for StaticProvider {
        fn name(&self) -> &'static str {
            "static"
        }

        fn group(&self) -> &str {
            "everyone"
        }

        fn whitelist(&self) -> &Whitelist {
            &self.whitelist
        }

        fn start_session(&self, state: &str, _host: &str) -> Session {
            Session::new(format!("https://static.example/?state={state}"), state.to_string())
        }

        async fn exchange(&self, _code: &str, _host: &str) -> Result<Token, Report<AuthError>> {
            Ok(Token::new("static"))
        }

        async fn identify(&self, _token: &Token) -> Result<Identity, Report<AuthError>> {
            Ok(Identity::new("static"))
        }

        async fn is_member(
            &self,
            _token: &Token,
            _identity: &Identity,
        ) -> Result<bool, Report<AuthError>> {
            Ok(true)
        }

        async fn revoke(&self, _token: &Token) -> Result<(), Report<AuthError>> {
            Ok(())
        }
    }

    fn build_static(config: &AuthConfig) -> Result<Arc<dyn Provider>, Report<AuthError>> {
        Ok(Arc::new(StaticProvider {
            whitelist: config.whitelist().clone(),
        }))
    }

    #[test]
    fn defaults_register_builtin_providers() {
        assert_eq!(ProviderRegistry::with_defaults().names(), vec!["github", "google"]);
    }

    #[test]
    fn builds_github_provider() {
        let config = AuthConfig::new("id", "secret")
            .with_provider("github")
            .with_provider_opt("organization", "exampleorg");
        let provider = ProviderRegistry::with_defaults()
            .build(&config)
            .expect("github provider");
        assert_eq!(provider.name(), "github");
        assert_eq!(provider.group(), "exampleorg");
    }

    #[test]
    fn builds_google_provider() {
        let config = AuthConfig::new("id", "secret")
            .with_provider("google")
            .with_provider_opt("domain", "example.com");
        let provider = ProviderRegistry::with_defaults()
            .build(&config)
            .expect("google provider");
        assert_eq!(provider.name(), "google");
        assert_eq!(provider.group(), "example.com");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = AuthConfig::new("id", "secret").with_provider("gitlab");
        let err = ProviderRegistry::with_defaults()
            .build(&config)
            .err()
            .expect("unknown provider");
        assert_eq!(
            err.current_context(),
            &AuthError::UnknownProvider {
                name: "gitlab".to_string()
            }
        );
    }

    #[test]
    fn constructor_errors_propagate() {
        let config = AuthConfig::new("id", "secret").with_provider("google");
        let err = ProviderRegistry::with_defaults()
            .build(&config)
            .err()
            .expect("domain missing");
        assert!(matches!(
            err.current_context(),
            AuthError::Configuration { .. }
        ));
    }

    #[test]
    fn custom_provider_can_be_registered() {
        let registry = ProviderRegistry::new().register("static", build_static);
        let config = AuthConfig::new("id", "secret")
            .with_provider("static")
            .with_whitelist(["root"]);

        let provider = registry.build(&config).expect("static provider");
        assert_eq!(provider.name(), "static");
        assert!(provider.whitelist().contains("root"));
        assert!(registry.build(&AuthConfig::new("id", "secret")).is_err());
    }
}
