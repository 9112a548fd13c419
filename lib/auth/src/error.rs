//! Error types for the auth crate.
//!
//! Every fallible operation returns `Report<AuthError>`. The variants keep
//! "could not verify" (`Exchange`, `MembershipCheck`) apart from the policy
//! decision `AuthorizationDenied`, so callers can retry the former and
//! reject the latter outright.

use std::fmt;

/// Errors from provider construction and the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Provider configuration is missing or invalid.
    Configuration { reason: String },
    /// No constructor is registered under this provider name.
    UnknownProvider { name: String },
    /// The state returned on the callback does not match the issued one.
    StateMismatch,
    /// Exchanging the authorization code for a token failed.
    Exchange { reason: String },
    /// Group membership could not be determined.
    MembershipCheck { provider: String, reason: String },
    /// The user authenticated but is neither whitelisted nor a group member.
    AuthorizationDenied { username: String },
    /// Revoking a token at the provider failed.
    Revocation { reason: String },
}

impl AuthError {
    /// Returns true for definitive policy rejections that must not be retried.
    #[must_use]
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::AuthorizationDenied { .. })
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn membership(provider: &str, reason: impl Into<String>) -> Self {
        Self::MembershipCheck {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => {
                write!(f, "invalid provider configuration: {reason}")
            }
            Self::UnknownProvider { name } => {
                write!(f, "unknown auth provider: {name}")
            }
            Self::StateMismatch => {
                write!(f, "state parameter does not match the issued session")
            }
            Self::Exchange { reason } => {
                write!(f, "token exchange failed: {reason}")
            }
            Self::MembershipCheck { provider, reason } => {
                write!(f, "{provider} membership check failed: {reason}")
            }
            Self::AuthorizationDenied { username } => {
                write!(f, "user {username} is not authorized")
            }
            Self::Revocation { reason } => {
                write!(f, "token revocation failed: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthError {}
