//! Identity providers and the normalized profile they produce.

use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthenticationError;

/// The closed set of supported identity providers.
///
/// Adding a provider means adding a variant here; every match over the set
/// then points at the places that need the new provider's details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::Github];

    /// Returns the provider's route and storage name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }

    /// Validates a provider name before any network call is made.
    ///
    /// Empty and unknown names fail with `UnsupportedProvider`.
    pub fn parse(name: &str) -> Result<Self, Report<AuthenticationError>> {
        name.parse().map_err(Report::from)
    }

    /// Returns true if `name` names a supported provider.
    #[must_use]
    pub fn is_supported(name: &str) -> bool {
        name.parse::<Provider>().is_ok()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthenticationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == s)
            .ok_or_else(|| AuthenticationError::UnsupportedProvider {
                name: s.to_string(),
            })
    }
}

/// A provider profile normalized into one shape regardless of source schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// The provider-native user id, stringified.
    pub external_id: String,
    /// The user's email address.
    pub email: String,
    /// Display name, if the provider supplied one.
    pub name: Option<String>,
    /// Avatar image URL, if the provider supplied one.
    pub avatar_url: Option<String>,
}

impl ProviderProfile {
    /// Creates a profile with the required fields.
    #[must_use]
    pub fn new(external_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            email: email.into(),
            name: None,
            avatar_url: None,
        }
    }

    /// Sets the display name. Blank names are dropped.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    /// Sets the avatar URL. Blank URLs are dropped.
    #[must_use]
    pub fn with_avatar_url(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url.filter(|u| !u.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_providers() {
        assert_eq!(Provider::parse("google").expect("google"), Provider::Google);
        assert_eq!(Provider::parse("github").expect("github"), Provider::Github);
    }

    #[test]
    fn rejects_unknown_and_empty_names() {
        for name in ["", "facebook", "Google", " google"] {
            let err = Provider::parse(name).unwrap_err();
            assert_eq!(
                err.current_context(),
                &AuthenticationError::UnsupportedProvider {
                    name: name.to_string()
                }
            );
            assert!(!Provider::is_supported(name));
        }
    }

    #[test]
    fn display_matches_route_name() {
        for provider in Provider::ALL {
            assert_eq!(provider.to_string().parse::<Provider>(), Ok(provider));
        }
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Provider::Github).expect("serialize");
        assert_eq!(json, "\"github\"");
    }

    #[test]
    fn profile_builder_drops_blank_fields() {
        let profile = ProviderProfile::new("42", "a@b.c")
            .with_name(Some("  ".to_string()))
            .with_avatar_url(Some("https://avatars.example/42".to_string()));

        assert_eq!(profile.name, None);
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://avatars.example/42")
        );
    }
}
