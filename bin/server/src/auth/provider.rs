//! Identity provider adapter.
//!
//! Each supported [`Provider`] has a fixed set of endpoints and scopes and
//! its own profile schema. The adapter builds sign-in URLs, exchanges
//! authorization codes and fetches profiles, normalizing every schema into
//! one [`ProviderProfile`].

use async_trait::async_trait;
use authgate_access::{AuthenticationError, Provider, ProviderProfile};
use authgate_core::Secret;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use reqwest::header::ACCEPT;
use rootcause::prelude::Report;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::config::{ProviderCredentials, ProvidersConfig};
use crate::error::ServerError;

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Static endpoints and scopes of a provider.
struct Endpoints {
    auth_url: &'static str,
    token_url: &'static str,
    profile_url: &'static str,
    scopes: &'static [&'static str],
}

const GITHUB_EMAILS_URL: &str = "https://api.github.com/user/emails";

fn endpoints(provider: Provider) -> Endpoints {
    match provider {
        Provider::Google => Endpoints {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
            token_url: "https://oauth2.googleapis.com/token",
            profile_url: "https://www.googleapis.com/oauth2/v2/userinfo",
            scopes: &["openid", "email", "profile"],
        },
        Provider::Github => Endpoints {
            auth_url: "https://github.com/login/oauth/authorize",
            token_url: "https://github.com/login/oauth/access_token",
            profile_url: "https://api.github.com/user",
            scopes: &["read:user", "user:email"],
        },
    }
}

/// The two-step provider capability: code exchange and profile fetch.
#[async_trait]
pub trait IdentityProviders: Send + Sync {
    /// Builds the provider redirect URL carrying `state`, requesting offline
    /// access and forced re-consent.
    fn sign_in_url(
        &self,
        provider: Provider,
        state: &str,
    ) -> Result<String, Report<AuthenticationError>>;

    /// Exchanges an authorization code for a provider access token.
    async fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
    ) -> Result<Secret, Report<AuthenticationError>>;

    /// Fetches and normalizes the profile behind a provider access token.
    async fn fetch_profile(
        &self,
        provider: Provider,
        token: &Secret,
    ) -> Result<ProviderProfile, Report<AuthenticationError>>;
}

/// Google's `userinfo` response.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleUserInfo {
    fn into_profile(self) -> Result<ProviderProfile, Report<AuthenticationError>> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(AuthenticationError::MissingEmail {
                provider: Provider::Google,
            })?;

        Ok(ProviderProfile::new(self.id, email)
            .with_name(self.name)
            .with_avatar_url(self.picture))
    }
}

/// GitHub's `/user` response.
#[derive(Debug, Deserialize)]
struct GithubUser {
    id: i64,
    login: String,
    email: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

/// One entry of GitHub's `/user/emails` response.
#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GithubUser {
    /// The public profile email, if the user exposes one.
    fn public_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }

    fn into_profile(self, email: String) -> ProviderProfile {
        let name = self.name.filter(|n| !n.trim().is_empty()).or(Some(self.login));
        ProviderProfile::new(self.id.to_string(), email)
            .with_name(name)
            .with_avatar_url(self.avatar_url)
    }
}

fn primary_verified_email(emails: Vec<GithubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

/// [`IdentityProviders`] backed by the providers' real OAuth endpoints.
pub struct OAuthProviders {
    clients: HashMap<Provider, ConfiguredClient>,
    http: reqwest::Client,
}

impl OAuthProviders {
    /// Builds clients for every provider with configured credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured redirect URL is invalid.
    pub fn new(config: &ProvidersConfig, http: reqwest::Client) -> Result<Self, Report<ServerError>> {
        let mut clients = HashMap::new();
        for provider in Provider::ALL {
            if let Some(credentials) = config.get(provider) {
                clients.insert(provider, build_client(provider, credentials)?);
                tracing::info!(%provider, "identity provider configured");
            }
        }

        Ok(Self { clients, http })
    }

    fn client(&self, provider: Provider) -> Result<&ConfiguredClient, Report<AuthenticationError>> {
        self.clients
            .get(&provider)
            .ok_or_else(|| AuthenticationError::ProviderNotConfigured { provider }.into())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        provider: Provider,
        url: &str,
        token: &Secret,
    ) -> Result<T, Report<AuthenticationError>> {
        let provider_error = |reason: String| -> Report<AuthenticationError> {
            AuthenticationError::ProviderError { provider, reason }.into()
        };

        self.http
            .get(url)
            .bearer_auth(token.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| provider_error(format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| provider_error(format!("{url} returned an error: {e}")))?
            .json()
            .await
            .map_err(|e| provider_error(format!("invalid response from {url}: {e}")))
    }
}

fn build_client(
    provider: Provider,
    credentials: &ProviderCredentials,
) -> Result<ConfiguredClient, Report<ServerError>> {
    let endpoints = endpoints(provider);
    let invalid = |what: &str, e: oauth2::url::ParseError| -> Report<ServerError> {
        ServerError::Provider {
            reason: format!("invalid {what} for {provider}: {e}"),
        }
        .into()
    };

    Ok(BasicClient::new(ClientId::new(credentials.client_id.clone()))
        .set_client_secret(ClientSecret::new(
            credentials.client_secret.expose().to_string(),
        ))
        .set_auth_uri(
            AuthUrl::new(endpoints.auth_url.to_string()).map_err(|e| invalid("auth url", e))?,
        )
        .set_token_uri(
            TokenUrl::new(endpoints.token_url.to_string()).map_err(|e| invalid("token url", e))?,
        )
        .set_redirect_uri(
            RedirectUrl::new(credentials.redirect_url.clone())
                .map_err(|e| invalid("redirect url", e))?,
        ))
}

#[async_trait]
impl IdentityProviders for OAuthProviders {
    fn sign_in_url(
        &self,
        provider: Provider,
        state: &str,
    ) -> Result<String, Report<AuthenticationError>> {
        let client = self.client(provider)?;
        let state = state.to_string();

        let (url, _) = client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(
                endpoints(provider)
                    .scopes
                    .iter()
                    .map(|scope| Scope::new((*scope).to_string())),
            )
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
    ) -> Result<Secret, Report<AuthenticationError>> {
        let client = self.client(provider)?;

        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthenticationError::ProviderError {
                provider,
                reason: format!("token exchange failed: {e}"),
            })?;

        Ok(Secret::new(token.access_token().secret().clone()))
    }

    async fn fetch_profile(
        &self,
        provider: Provider,
        token: &Secret,
    ) -> Result<ProviderProfile, Report<AuthenticationError>> {
        let profile_url = endpoints(provider).profile_url;

        match provider {
            Provider::Google => {
                let info: GoogleUserInfo = self.get_json(provider, profile_url, token).await?;
                info.into_profile()
            }
            Provider::Github => {
                let user: GithubUser = self.get_json(provider, profile_url, token).await?;
                let email = match user.public_email() {
                    Some(email) => email.to_string(),
                    None => {
                        let emails: Vec<GithubEmail> =
                            self.get_json(provider, GITHUB_EMAILS_URL, token).await?;
                        primary_verified_email(emails)
                            .ok_or(AuthenticationError::MissingEmail { provider })?
                    }
                };
                Ok(user.into_profile(email))
            }
        }
    }
}
