//! User domain type.
//!
//! A user is one person across every provider they have signed in with. The
//! email address is the join key; the provider fields record whichever
//! provider created the row first.

use authgate_core::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::provider::{Provider, ProviderProfile};

/// An account keyed by email.
///
/// Serializes to the public profile shape returned by `/auth/me`; the
/// provider-native id and bookkeeping timestamps stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Internal user ID.
    id: UserId,
    /// Display name from the creating provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Email address, unique among active users.
    email: String,
    /// Avatar URL from the creating provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    /// Always true on creation; providers only hand out verified addresses.
    is_email_verified: bool,
    /// The provider that created this user.
    provider: Provider,
    /// The provider-native id of the creating provider account.
    #[serde(skip)]
    provider_user_id: String,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Builds a new, unsaved user from a provider profile.
    #[must_use]
    pub fn from_profile(profile: &ProviderProfile, provider: Provider) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            avatar_url: profile.avatar_url.clone(),
            is_email_verified: true,
            provider,
            provider_user_id: profile.external_id.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        name: Option<String>,
        email: String,
        avatar_url: Option<String>,
        is_email_verified: bool,
        provider: Provider,
        provider_user_id: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            avatar_url,
            is_email_verified,
            provider,
            provider_user_id,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    #[must_use]
    pub fn is_email_verified(&self) -> bool {
        self.is_email_verified
    }

    /// Returns the provider that created this user.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the provider-native id of the creating account.
    #[must_use]
    pub fn provider_user_id(&self) -> &str {
        &self.provider_user_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns true if the user has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Marks the user soft-deleted.
    pub fn mark_deleted(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}
