//! The capability set every identity provider implements.
//!
//! A provider is built once from an [`AuthConfig`](crate::AuthConfig) and is
//! immutable afterwards, so a single instance can serve any number of
//! concurrent login attempts without locking.
//!
//! # Authorization
//!
//! A user is authorized when their username is whitelisted **or** the
//! provider confirms membership in the configured group (GitHub organization
//! or Google Workspace domain). The whitelist is checked first and needs no
//! network call. A failed membership lookup is reported as
//! `AuthError::MembershipCheck`, never as an authorization.

use crate::error::AuthError;
use crate::session::Session;
use crate::token::Token;
use async_trait::async_trait;
use rootcause::prelude::Report;
use tollgate_core::Whitelist;
use tracing::{info, warn};

/// The authenticated user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Username checked against the whitelist.
    pub username: String,
    /// Email address, if the provider disclosed one.
    pub email: Option<String>,
    /// Whether the provider verified the email address.
    pub email_verified: Option<bool>,
    /// Hosted domain claim (Google Workspace only).
    pub hosted_domain: Option<String>,
}

impl Identity {
    /// Creates an identity with only a username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            email_verified: None,
            hosted_domain: None,
        }
    }

    /// Sets the email address and its verification status.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>, verified: Option<bool>) -> Self {
        self.email = email;
        self.email_verified = verified;
        self
    }

    /// Sets the hosted domain claim.
    #[must_use]
    pub fn with_hosted_domain(mut self, hosted_domain: Option<String>) -> Self {
        self.hosted_domain = hosted_domain;
        self
    }
}

/// Outcome of the authorization policy for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The username is on the whitelist.
    Whitelisted,
    /// The provider confirmed group membership.
    Member,
    /// Neither whitelisted nor a member.
    Denied,
}

impl Decision {
    /// Returns true unless the decision is a denial.
    #[must_use]
    pub fn is_authorized(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// An OAuth2 identity provider with a group-membership policy.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry name of this provider.
    fn name(&self) -> &'static str;

    /// The organization or domain users must belong to.
    fn group(&self) -> &str;

    /// Usernames authorized regardless of group membership.
    fn whitelist(&self) -> &Whitelist;

    /// Builds the authorization redirect for a login attempt.
    ///
    /// `state` is threaded through verbatim. `host` is the host of the
    /// incoming request, used when the callback URL is relative.
    fn start_session(&self, state: &str, host: &str) -> Session;

    /// Exchanges the authorization code from the callback for a token.
    async fn exchange(&self, code: &str, host: &str) -> Result<Token, Report<AuthError>>;

    /// Looks up who the token belongs to.
    async fn identify(&self, token: &Token) -> Result<Identity, Report<AuthError>>;

    /// Checks whether `identity` belongs to the configured group.
    async fn is_member(
        &self,
        token: &Token,
        identity: &Identity,
    ) -> Result<bool, Report<AuthError>>;

    /// Revokes the token at the provider.
    async fn revoke(&self, token: &Token) -> Result<(), Report<AuthError>>;

    /// Resolves the username the token belongs to.
    async fn username(&self, token: &Token) -> Result<String, Report<AuthError>> {
        Ok(self.identify(token).await?.username)
    }

    /// Applies the whitelist-or-membership policy.
    async fn evaluate(&self, token: &Token) -> Result<(Identity, Decision), Report<AuthError>> {
        let identity = self.identify(token).await?;

        if self.whitelist().contains(&identity.username) {
            info!(provider = self.name(), username = %identity.username, "user is whitelisted");
            return Ok((identity, Decision::Whitelisted));
        }

        let decision = if self.is_member(token, &identity).await? {
            info!(provider = self.name(), username = %identity.username, group = self.group(), "user is a group member");
            Decision::Member
        } else {
            warn!(provider = self.name(), username = %identity.username, group = self.group(), "user is not authorized");
            Decision::Denied
        };

        Ok((identity, decision))
    }

    /// Returns whether the token's owner is authorized.
    async fn authorize(&self, token: &Token) -> Result<bool, Report<AuthError>> {
        let (_, decision) = self.evaluate(token).await?;
        Ok(decision.is_authorized())
    }

    /// Returns the authorized username or `AuthError::AuthorizationDenied`.
    async fn require_authorized(&self, token: &Token) -> Result<String, Report<AuthError>> {
        let (identity, decision) = self.evaluate(token).await?;
        if !decision.is_authorized() {
            return Err(AuthError::AuthorizationDenied {
                username: identity.username,
            }
            .into());
        }
        Ok(identity.username)
    }
}
