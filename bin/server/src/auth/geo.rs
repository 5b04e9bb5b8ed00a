//! ipapi-backed IP geolocation.

use async_trait::async_trait;
use authgate_access::{GeoError, Geolocator, format_location};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::GeolocationConfig;
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    city: Option<String>,
    country_name: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

impl IpApiResponse {
    fn into_location(self, ip: &str) -> Result<String, Report<GeoError>> {
        if self.error {
            return Err(GeoError::Lookup {
                ip: ip.to_string(),
                reason: self.reason.unwrap_or_else(|| "lookup rejected".to_string()),
            }
            .into());
        }
        Ok(format_location(
            self.city.as_deref(),
            self.country_name.as_deref(),
        ))
    }
}

/// Looks up `{endpoint}/{ip}/json/`.
pub struct IpApiGeolocator {
    http: reqwest::Client,
    endpoint: String,
}

impl IpApiGeolocator {
    /// Creates a geolocator with its own timeout-bounded client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GeolocationConfig) -> Result<Self, Report<ServerError>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServerError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geolocator for IpApiGeolocator {
    async fn locate(&self, ip: &str) -> Result<String, Report<GeoError>> {
        let lookup_error = |reason: String| -> Report<GeoError> {
            GeoError::Lookup {
                ip: ip.to_string(),
                reason,
            }
            .into()
        };

        let addr: IpAddr = ip
            .parse()
            .map_err(|_| lookup_error("not an IP address".to_string()))?;

        let response: IpApiResponse = self
            .http
            .get(format!("{}/{addr}/json/", self.endpoint))
            .send()
            .await
            .map_err(|e| lookup_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| lookup_error(e.to_string()))?
            .json()
            .await
            .map_err(|e| lookup_error(e.to_string()))?;

        response.into_location(ip)
    }
}
