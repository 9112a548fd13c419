//! Google provider: authorization by Google Workspace domain.
//!
//! The `hd` parameter sent with the authorization request only steers the
//! account chooser towards the right domain. The domain is verified again
//! from the userinfo response after the callback.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::{Endpoints, OAuthClient};
use crate::provider::{Identity, Provider};
use crate::session::Session;
use crate::token::Token;
use async_trait::async_trait;
use reqwest::StatusCode;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::sync::Arc;
use tollgate_core::Whitelist;
use tracing::{debug, info, instrument};

/// Registry name of the Google provider.
pub const NAME: &str = "google";

/// Provider option naming the required Workspace domain.
pub const DOMAIN_OPT: &str = "domain";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const REVOCATION_URL: &str = "https://oauth2.googleapis.com/revoke";
const SCOPES: &[&str] = &["openid", "email", "profile"];

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    email_verified: Option<bool>,
    hd: Option<String>,
}

/// Google OAuth2 provider.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    oauth: OAuthClient,
    domain: String,
    whitelist: Whitelist,
    userinfo_url: String,
    revocation_url: String,
}

impl GoogleProvider {
    /// Builds the provider, requiring the `domain` option.
    ///
    /// The domain is stored lower-cased.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when `domain` is missing or empty,
    /// whether or not a whitelist is configured.
    pub fn new(config: &AuthConfig) -> Result<Self, Report<AuthError>> {
        let domain = config.required_opt(DOMAIN_OPT)?.to_ascii_lowercase();
        let oauth = OAuthClient::new(
            config,
            Endpoints {
                auth_url: AUTH_URL,
                token_url: TOKEN_URL,
                scopes: SCOPES,
            },
        )?;

        info!(
            domain = %domain,
            whitelisted = config.whitelist().len(),
            "configured google provider"
        );

        Ok(Self {
            oauth,
            domain,
            whitelist: config.whitelist().clone(),
            userinfo_url: USERINFO_URL.to_string(),
            revocation_url: REVOCATION_URL.to_string(),
        })
    }

    /// Registry constructor.
    ///
    /// # Errors
    ///
    /// See [`GoogleProvider::new`].
    pub fn boxed(config: &AuthConfig) -> Result<Arc<dyn Provider>, Report<AuthError>> {
        Ok(Arc::new(Self::new(config)?))
    }

    /// Overrides the userinfo endpoint.
    #[must_use]
    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    /// Overrides the token revocation endpoint.
    #[must_use]
    pub fn with_revocation_url(mut self, url: impl Into<String>) -> Self {
        self.revocation_url = url.into();
        self
    }

    /// Returns the Workspace domain users must belong to.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the OAuth2 client configuration.
    #[must_use]
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    async fn fetch_userinfo(&self, token: &Token) -> Result<UserInfo, String> {
        let response = self
            .oauth
            .http()
            .get(&self.userinfo_url)
            .bearer_auth(token.access_token())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("userinfo returned {}", response.status()));
        }

        response.json().await.map_err(|e| e.to_string())
    }
}

/// Domain part of an email address, lower-cased.
fn email_domain(email: &str) -> Option<String> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn group(&self) -> &str {
        &self.domain
    }

    fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    fn start_session(&self, state: &str, host: &str) -> Session {
        self.oauth
            .start_session(state, host, &[("hd", self.domain.as_str())])
    }

    async fn exchange(&self, code: &str, host: &str) -> Result<Token, Report<AuthError>> {
        self.oauth.exchange(code, host).await
    }

    /// Only verified email addresses are accepted. The username is the
    /// local part of the address when it belongs to the configured domain,
    /// and the full address otherwise, so a whitelist entry without a domain
    /// never matches an outside account.
    #[instrument(skip_all)]
    async fn identify(&self, token: &Token) -> Result<Identity, Report<AuthError>> {
        let info = self
            .fetch_userinfo(token)
            .await
            .map_err(|reason| AuthError::membership(NAME, reason))?;

        let email = info
            .email
            .ok_or_else(|| AuthError::membership(NAME, "userinfo has no email address"))?;
        if info.email_verified != Some(true) {
            return Err(AuthError::membership(
                NAME,
                format!("email address {email} is not verified"),
            )
            .into());
        }

        let username = match email.split_once('@') {
            Some((local, _)) if !local.is_empty() => {
                if email_domain(&email).as_deref() == Some(self.domain.as_str()) {
                    local.to_string()
                } else {
                    email.to_ascii_lowercase()
                }
            }
            _ => {
                return Err(AuthError::membership(
                    NAME,
                    format!("malformed email address in userinfo: {email}"),
                )
                .into());
            }
        };

        debug!(username = %username, hosted_domain = ?info.hd, "resolved google user");
        Ok(Identity::new(username)
            .with_email(Some(email), info.email_verified)
            .with_hosted_domain(info.hd))
    }

    /// Prefers the `hd` claim and falls back to the email domain for
    /// consumer accounts. Unverified email addresses never count.
    async fn is_member(
        &self,
        _token: &Token,
        identity: &Identity,
    ) -> Result<bool, Report<AuthError>> {
        if identity.email_verified != Some(true) {
            return Ok(false);
        }

        let domain = identity
            .hosted_domain
            .as_deref()
            .map(str::to_ascii_lowercase)
            .or_else(|| identity.email.as_deref().and_then(email_domain));

        Ok(domain.as_deref() == Some(self.domain.as_str()))
    }

    #[instrument(skip_all)]
    async fn revoke(&self, token: &Token) -> Result<(), Report<AuthError>> {
        let response = self
            .oauth
            .http()
            .post(&self.revocation_url)
            .form(&[("token", token.access_token())])
            .send()
            .await
            .map_err(|e| AuthError::Revocation {
                reason: e.to_string(),
            })?;

        if response.status() != StatusCode::OK {
            return Err(AuthError::Revocation {
                reason: format!("token revocation returned {}", response.status()),
            }
            .into());
        }

        debug!("revoked google token");
        Ok(())
    }
}
