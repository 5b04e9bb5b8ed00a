//! The authenticated request context.

use authgate_core::UserId;

use crate::session::Session;
use crate::user::User;

/// The user and live session behind a verified access token.
///
/// Handlers behind the authorization gate receive this instead of raw
/// claims, so they never see a revoked session or a deleted user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    session: Session,
    user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn new(session: Session, user: User) -> Self {
        Self { session, user }
    }

    /// Returns the authenticated user's ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.id()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Consumes the context, returning the user record.
    #[must_use]
    pub fn into_user(self) -> User {
        self.user
    }
}
