//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `AUTH__JWT_SECRET` or
//! `PROVIDERS__GITHUB__CLIENT_ID`.

use authgate_access::Provider;
use authgate_core::Secret;
use authgate_credentials::{
    DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS, DEFAULT_STATE_TTL_MINUTES,
};
use serde::Deserialize;

/// Server configuration composed from per-component sections.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Versioned prefix mounted in front of every route.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Maximum pooled database connections.
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Redis URL. Only used by the health check.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` for human-readable logs, `json` for structured output.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Credential and cookie settings.
    pub auth: AuthConfig,

    /// Identity provider credentials.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// IP geolocation lookup settings.
    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Token lifetimes, signing secret and cookie flags.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for state and credential tokens.
    pub jwt_secret: Secret,

    #[serde(default = "default_state_ttl_minutes")]
    pub state_ttl_minutes: i64,

    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,

    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,

    /// Lifetime of the `device_id` cookie.
    #[serde(default = "default_device_cookie_max_age_minutes")]
    pub device_cookie_max_age_minutes: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

/// Client credentials for one identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: Secret,
    pub redirect_url: String,
}

/// Credentials per provider. A provider left unset cannot be signed in with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    pub google: Option<ProviderCredentials>,
    pub github: Option<ProviderCredentials>,
}

impl ProvidersConfig {
    /// Returns the credentials configured for `provider`, if any.
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&ProviderCredentials> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Github => self.github.as_ref(),
        }
    }
}

/// IP geolocation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_geolocation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_geolocation_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geolocation_endpoint(),
            timeout_seconds: default_geolocation_timeout_seconds(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_state_ttl_minutes() -> i64 {
    DEFAULT_STATE_TTL_MINUTES
}

fn default_access_ttl_minutes() -> i64 {
    DEFAULT_ACCESS_TTL_MINUTES
}

fn default_refresh_ttl_days() -> i64 {
    DEFAULT_REFRESH_TTL_DAYS
}

fn default_device_cookie_max_age_minutes() -> i64 {
    60
}

fn default_secure_cookies() -> bool {
    true
}

fn default_geolocation_endpoint() -> String {
    "https://ipapi.co".to_string()
}

fn default_geolocation_timeout_seconds() -> u64 {
    3
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source(
        source: impl config::Source + Send + Sync + 'static,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        config::Environment::default()
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = ServerConfig::from_source(env(&[
            ("DATABASE_URL", "postgres://localhost/authgate"),
            ("AUTH__JWT_SECRET", "s3cret"),
        ]))
        .expect("config");

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.auth.state_ttl_minutes, 15);
        assert_eq!(config.auth.access_ttl_minutes, 60);
        assert_eq!(config.auth.refresh_ttl_days, 7);
        assert!(config.auth.secure_cookies);
        assert!(config.providers.get(Provider::Google).is_none());
        assert_eq!(config.geolocation.endpoint, "https://ipapi.co");
    }

    #[test]
    fn nested_provider_credentials_are_read() {
        let config = ServerConfig::from_source(env(&[
            ("DATABASE_URL", "postgres://localhost/authgate"),
            ("AUTH__JWT_SECRET", "s3cret"),
            ("AUTH__SECURE_COOKIES", "false"),
            ("LOG_FORMAT", "json"),
            ("PROVIDERS__GITHUB__CLIENT_ID", "gh-client"),
            ("PROVIDERS__GITHUB__CLIENT_SECRET", "gh-secret"),
            (
                "PROVIDERS__GITHUB__REDIRECT_URL",
                "http://localhost:8080/api/v1/auth/callback/github",
            ),
        ]))
        .expect("config");

        let github = config.providers.get(Provider::Github).expect("github");
        assert_eq!(github.client_id, "gh-client");
        assert_eq!(github.client_secret.expose(), "gh-secret");
        assert!(!config.auth.secure_cookies);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = ServerConfig::from_source(env(&[(
            "DATABASE_URL",
            "postgres://localhost/authgate",
        )]));
        assert!(result.is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = ServerConfig::from_source(env(&[
            ("DATABASE_URL", "postgres://localhost/authgate"),
            ("AUTH__JWT_SECRET", "do-not-print"),
        ]))
        .expect("config");

        assert!(!format!("{config:?}").contains("do-not-print"));
    }
}
