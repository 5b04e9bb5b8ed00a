//! Store traits for users and sessions.
//!
//! Reads only ever return active rows; soft-deleted users and sessions are
//! invisible to every lookup. The `insert_or_get` operations are the only
//! writes that create rows and must be atomic with respect to the uniqueness
//! of active rows: when a concurrent writer wins, the winner's row is
//! returned instead of an error.

use async_trait::async_trait;
use authgate_core::{DeviceId, SessionId, UserId};
use rootcause::prelude::Report;

use crate::error::StoreError;
use crate::session::Session;
use crate::user::User;

/// Persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds an active user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>>;

    /// Finds the active user with this email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Report<StoreError>>;

    /// Inserts `user` unless an active user with the same email exists, in
    /// which case the existing row is returned unchanged.
    async fn insert_or_get(&self, user: User) -> Result<User, Report<StoreError>>;
}

/// Persistence for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Finds an active session by id.
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, Report<StoreError>>;

    /// Finds the active session for a user on a device.
    async fn find_for_device(
        &self,
        user_id: UserId,
        device_id: &DeviceId,
    ) -> Result<Option<Session>, Report<StoreError>>;

    /// Inserts `session` unless an active session for the same user and
    /// device exists, in which case the existing row is returned unchanged.
    async fn insert_or_get(&self, session: Session) -> Result<Session, Report<StoreError>>;

    /// Soft-deletes every active session for a user on a device.
    ///
    /// Returns the number of sessions revoked; zero is not an error.
    async fn soft_delete_for_device(
        &self,
        user_id: UserId,
        device_id: &DeviceId,
    ) -> Result<u64, Report<StoreError>>;
}
