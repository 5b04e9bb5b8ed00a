//! Maps provider profiles onto user records.

use authgate_core::UserId;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::instrument;

use crate::error::AuthenticationError;
use crate::provider::{Provider, ProviderProfile};
use crate::store::UserStore;
use crate::user::User;

/// Finds or creates the user for a provider profile.
///
/// Email is the identity key. An existing active user with the profile's
/// email is returned unchanged, whichever provider created it; otherwise a
/// new user is created from the profile.
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Returns the user for `profile`, creating one on first sign-in.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn resolve(
        &self,
        profile: &ProviderProfile,
        provider: Provider,
    ) -> Result<User, Report<AuthenticationError>> {
        if profile.email.trim().is_empty() {
            return Err(AuthenticationError::MissingEmail { provider }.into());
        }

        if let Some(existing) = self
            .users
            .find_by_email(&profile.email)
            .await
            .map_err(|e| e.context(AuthenticationError::Storage))?
        {
            tracing::debug!(user_id = %existing.id(), "matched existing user by email");
            return Ok(existing);
        }

        let user = self
            .users
            .insert_or_get(User::from_profile(profile, provider))
            .await
            .map_err(|e| e.context(AuthenticationError::Storage))?;

        tracing::info!(user_id = %user.id(), provider = %user.provider(), "resolved user");
        Ok(user)
    }

    /// Returns the active user with this id.
    pub async fn find_active(&self, id: UserId) -> Result<User, Report<AuthenticationError>> {
        self.users
            .find_by_id(id)
            .await
            .map_err(|e| e.context(AuthenticationError::Storage))?
            .ok_or_else(|| {
                AuthenticationError::UserNotFound {
                    user_id: id.to_string(),
                }
                .into()
            })
    }
}
