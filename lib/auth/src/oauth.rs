//! OAuth2 client plumbing shared by every provider.
//!
//! Wraps the `oauth2` crate's `BasicClient`. Endpoint URLs are validated once
//! at construction; the client itself is rebuilt per call because the
//! redirect URI may depend on the host of the incoming request.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::session::Session;
use crate::token::Token;
use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenUrl,
};
use rootcause::prelude::Report;
use tracing::{debug, instrument, warn};

/// Path used when no callback URL is configured.
pub const DEFAULT_CALLBACK_PATH: &str = "/auth/callback";

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Provider endpoints and requested scopes.
#[derive(Debug, Clone, Copy)]
pub struct Endpoints<'a> {
    pub auth_url: &'a str,
    pub token_url: &'a str,
    pub scopes: &'a [&'a str],
}

/// Validated OAuth2 client configuration for one provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    callback_url: String,
    scopes: Vec<Scope>,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Builds the client configuration for `endpoints`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if an endpoint URL is malformed or
    /// the HTTP client cannot be created.
    pub fn new(config: &AuthConfig, endpoints: Endpoints<'_>) -> Result<Self, Report<AuthError>> {
        let auth_url = AuthUrl::new(endpoints.auth_url.to_string()).map_err(|e| {
            AuthError::configuration(format!("invalid authorization URL: {e}"))
        })?;
        let token_url = TokenUrl::new(endpoints.token_url.to_string())
            .map_err(|e| AuthError::configuration(format!("invalid token URL: {e}")))?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            auth_url,
            token_url,
            callback_url: config.callback_url().trim().to_string(),
            scopes: endpoints
                .scopes
                .iter()
                .map(|s| Scope::new((*s).to_string()))
                .collect(),
            http,
        })
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        self.client_secret.secret()
    }

    /// Returns the authorization endpoint.
    #[must_use]
    pub fn auth_url(&self) -> &str {
        self.auth_url.as_str()
    }

    /// Returns the token endpoint.
    #[must_use]
    pub fn token_url(&self) -> &str {
        self.token_url.as_str()
    }

    /// Returns the requested scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|s| s.as_str())
    }

    /// Returns the HTTP client used for every provider call.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolves the redirect URI for a request arriving at `host`.
    ///
    /// An absolute configured callback URL wins. Otherwise the configured
    /// path (or [`DEFAULT_CALLBACK_PATH`]) is joined to the host. Loopback
    /// hosts get `http`, everything else `https`.
    #[must_use]
    pub fn redirect_url(&self, host: &str) -> Option<RedirectUrl> {
        if let Some(url) = Url::parse(&self.callback_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
        {
            return RedirectUrl::new(url.to_string()).ok();
        }

        let host = host.trim();
        if host.is_empty() {
            warn!("relative callback URL configured but request has no host");
            return None;
        }

        let path = if self.callback_url.is_empty() {
            DEFAULT_CALLBACK_PATH
        } else {
            self.callback_url.as_str()
        };
        let scheme = if is_loopback(host) { "http" } else { "https" };

        match RedirectUrl::new(format!(
            "{scheme}://{host}/{}",
            path.trim_start_matches('/')
        )) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "could not derive callback URL from request host");
                None
            }
        }
    }

    /// Builds the authorization-code redirect for `state`.
    ///
    /// Pure URL construction: the same inputs always produce the same URL.
    #[must_use]
    pub fn start_session(&self, state: &str, host: &str, extra: &[(&str, &str)]) -> Session {
        let client = self.client(host);

        let mut request = client
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .add_scopes(self.scopes.iter().cloned());

        for (name, value) in extra {
            request = request.add_extra_param(*name, *value);
        }

        let (auth_url, csrf_token) = request.url();

        Session::new(auth_url.to_string(), csrf_token.secret().clone())
    }

    /// Exchanges an authorization code for a token.
    ///
    /// `host` must be the same value passed to [`OAuthClient::start_session`]
    /// so that the redirect URI matches.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Exchange` if the code is empty or the provider
    /// rejects the request.
    #[instrument(skip(self, code), fields(token_url = %self.token_url.as_str()))]
    pub async fn exchange(&self, code: &str, host: &str) -> Result<Token, Report<AuthError>> {
        if code.trim().is_empty() {
            return Err(AuthError::Exchange {
                reason: "authorization code is empty".to_string(),
            }
            .into());
        }

        let response = self
            .client(host)
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::Exchange {
                reason: e.to_string(),
            })?;

        debug!("exchanged authorization code for token");
        Ok(Token::from(response))
    }

    fn client(&self, host: &str) -> ConfiguredClient {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone());

        match self.redirect_url(host) {
            Some(redirect) => client.set_redirect_uri(redirect),
            None => client,
        }
    }
}

fn is_loopback(host: &str) -> bool {
    let name = host
        .strip_prefix('[')
        .and_then(|h| h.split_once(']'))
        .map_or_else(|| host.split(':').next().unwrap_or(host), |(h, _)| h);
    matches!(name, "localhost" | "127.0.0.1" | "::1")
}
