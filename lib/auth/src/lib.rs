//! OAuth2 identity providers and the tollgate authorization policy.
//!
//! A [`Provider`] drives the authorization-code flow against GitHub or
//! Google and decides whether the authenticated user may obtain a
//! certificate: the username must be on the configured [`Whitelist`], or
//! the user must belong to the configured GitHub organization or Google
//! Workspace domain.
//!
//! # Example
//!
//! ```no_run
//! use oauth2::CsrfToken;
//! use tollgate_auth::{AuthConfig, ProviderRegistry};
//!
//! # async fn login(code: &str) -> Result<(), rootcause::prelude::Report<tollgate_auth::AuthError>> {
//! let config = AuthConfig::new("client-id", "client-secret")
//!     .with_provider("github")
//!     .with_provider_opt("organization", "exampleorg")
//!     .with_callback_url("https://ca.example.com/auth/callback");
//! let provider = ProviderRegistry::with_defaults().build(&config)?;
//!
//! let state = CsrfToken::new_random();
//! let session = provider.start_session(state.secret(), "ca.example.com");
//! // redirect to session.auth_url(), then on the callback:
//! session.verify_state(state.secret())?;
//! let token = provider.exchange(code, "ca.example.com").await?;
//! let username = provider.require_authorized(&token).await?;
//! # let _ = username;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod github;
pub mod google;
pub mod oauth;
pub mod provider;
pub mod registry;
pub mod session;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use github::GithubProvider;
pub use google::GoogleProvider;
pub use oauth::{Endpoints, OAuthClient};
pub use provider::{Decision, Identity, Provider};
pub use registry::{ProviderConstructor, ProviderRegistry};
pub use session::{Session, verify_state};
pub use tollgate_core::Whitelist;
pub use token::Token;
