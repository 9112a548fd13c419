//! GitHub provider: authorization by organization membership.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::{Endpoints, OAuthClient};
use crate::provider::{Identity, Provider};
use crate::session::Session;
use crate::token::Token;
use async_trait::async_trait;
use reqwest::{StatusCode, Url, header};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::sync::Arc;
use tollgate_core::Whitelist;
use tracing::{debug, info, instrument};

/// Registry name of the GitHub provider.
pub const NAME: &str = "github";

/// Provider option naming the required organization.
pub const ORGANIZATION_OPT: &str = "organization";

const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_BASE_URL: &str = "https://api.github.com";

/// `read:org` is needed to see private organization memberships.
const SCOPES: &[&str] = &["user:email", "read:org"];

const CLIENT_USER_AGENT: &str = concat!("tollgate/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
    email: Option<String>,
}

/// GitHub OAuth2 provider.
#[derive(Debug, Clone)]
pub struct GithubProvider {
    oauth: OAuthClient,
    organization: String,
    whitelist: Whitelist,
    api_base_url: String,
}

impl GithubProvider {
    /// Builds the provider, requiring the `organization` option.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when `organization` is missing or
    /// empty, whether or not a whitelist is configured.
    pub fn new(config: &AuthConfig) -> Result<Self, Report<AuthError>> {
        let organization = config.required_opt(ORGANIZATION_OPT)?;
        let oauth = OAuthClient::new(
            config,
            Endpoints {
                auth_url: AUTH_URL,
                token_url: TOKEN_URL,
                scopes: SCOPES,
            },
        )?;

        info!(
            organization = %organization,
            whitelisted = config.whitelist().len(),
            "configured github provider"
        );

        Ok(Self {
            oauth,
            organization,
            whitelist: config.whitelist().clone(),
            api_base_url: API_BASE_URL.to_string(),
        })
    }

    /// Registry constructor.
    ///
    /// # Errors
    ///
    /// See [`GithubProvider::new`].
    pub fn boxed(config: &AuthConfig) -> Result<Arc<dyn Provider>, Report<AuthError>> {
        Ok(Arc::new(Self::new(config)?))
    }

    /// Points API calls at a different GitHub API root (GitHub Enterprise).
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Returns the organization users must belong to.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Returns the OAuth2 client configuration.
    #[must_use]
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = Url::parse(&self.api_base_url).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|()| format!("{} cannot be a base URL", self.api_base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_user(&self, token: &Token) -> Result<GithubUser, String> {
        let url = self.api_url(&["user"])?;
        let response = self
            .oauth
            .http()
            .get(url)
            .bearer_auth(token.access_token())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("GET /user returned {}", response.status()));
        }

        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Provider for GithubProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn group(&self) -> &str {
        &self.organization
    }

    fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    fn start_session(&self, state: &str, host: &str) -> Session {
        self.oauth.start_session(state, host, &[])
    }

    async fn exchange(&self, code: &str, host: &str) -> Result<Token, Report<AuthError>> {
        self.oauth.exchange(code, host).await
    }

    #[instrument(skip_all)]
    async fn identify(&self, token: &Token) -> Result<Identity, Report<AuthError>> {
        let user = self
            .fetch_user(token)
            .await
            .map_err(|reason| AuthError::membership(NAME, reason))?;

        debug!(login = %user.login, "resolved github user");
        Ok(Identity::new(user.login).with_email(user.email, None))
    }

    /// Asks `GET /orgs/{org}/members/{user}`: 204 means member, 404 means
    /// not a member, and 302 means the token owner cannot see the member
    /// list because they are not in the organization themselves.
    #[instrument(skip(self, token), fields(organization = %self.organization, username = %identity.username))]
    async fn is_member(
        &self,
        token: &Token,
        identity: &Identity,
    ) -> Result<bool, Report<AuthError>> {
        let url = self
            .api_url(&[
                "orgs",
                self.organization.as_str(),
                "members",
                identity.username.as_str(),
            ])
            .map_err(|reason| AuthError::membership(NAME, reason))?;

        let response = self
            .oauth
            .http()
            .get(url)
            .bearer_auth(token.access_token())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| AuthError::membership(NAME, e.to_string()))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::FOUND => Ok(false),
            status => Err(AuthError::membership(
                NAME,
                format!("organization membership lookup returned {status}"),
            )
            .into()),
        }
    }

    #[instrument(skip_all)]
    async fn revoke(&self, token: &Token) -> Result<(), Report<AuthError>> {
        let url = self
            .api_url(&["applications", self.oauth.client_id(), "token"])
            .map_err(|reason| AuthError::Revocation { reason })?;

        let response = self
            .oauth
            .http()
            .delete(url)
            .basic_auth(self.oauth.client_id(), Some(self.oauth.client_secret()))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, CLIENT_USER_AGENT)
            .json(&serde_json::json!({ "access_token": token.access_token() }))
            .send()
            .await
            .map_err(|e| AuthError::Revocation {
                reason: e.to_string(),
            })?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(AuthError::Revocation {
                reason: format!("token revocation returned {}", response.status()),
            }
            .into());
        }

        debug!("revoked github token");
        Ok(())
    }
}
