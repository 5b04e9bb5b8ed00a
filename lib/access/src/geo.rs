//! IP geolocation seam.

use async_trait::async_trait;
use rootcause::prelude::Report;

use crate::error::GeoError;

/// Location recorded when a lookup fails or has nothing to say.
pub const UNKNOWN_LOCATION: &str = "Unknown, Unknown";

/// Resolves an IP address to a human-readable "City, Country" string.
///
/// Failures are never fatal to the caller; sessions fall back to
/// [`UNKNOWN_LOCATION`].
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self, ip: &str) -> Result<String, Report<GeoError>>;
}

/// Formats a location, substituting "Unknown" for missing parts.
#[must_use]
pub fn format_location(city: Option<&str>, country: Option<&str>) -> String {
    let part = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    };
    format!("{}, {}", part(city), part(country))
}
