//! In-memory store used by tests and local development.

use async_trait::async_trait;
use authgate_core::{DeviceId, SessionId, UserId};
use rootcause::prelude::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::session::Session;
use crate::store::{SessionStore, UserStore};
use crate::user::User;

/// A store holding users and sessions in process memory.
///
/// Each operation holds the table lock for its whole duration, which makes
/// `insert_or_get` atomic in the same way the relational store's unique
/// indexes do.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Soft-deletes a user. Returns false if no such user exists.
    pub async fn soft_delete_user(&self, id: UserId) -> bool {
        let mut users = self.users.lock().await;
        match users.get_mut(&id) {
            Some(user) if !user.is_deleted() => {
                user.mark_deleted();
                true
            }
            _ => false,
        }
    }

    /// Returns the number of users, including soft-deleted ones.
    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }

    /// Returns the number of sessions, including revoked ones.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).filter(|u| !u.is_deleted()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Report<StoreError>> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|u| !u.is_deleted() && u.email() == email)
            .cloned())
    }

    async fn insert_or_get(&self, user: User) -> Result<User, Report<StoreError>> {
        let mut users = self.users.lock().await;
        if let Some(existing) = users
            .values()
            .find(|u| !u.is_deleted() && u.email() == user.email())
        {
            return Ok(existing.clone());
        }
        users.insert(user.id(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, Report<StoreError>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(&id).filter(|s| s.is_active()).cloned())
    }

    async fn find_for_device(
        &self,
        user_id: UserId,
        device_id: &DeviceId,
    ) -> Result<Option<Session>, Report<StoreError>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .values()
            .find(|s| s.is_active() && s.belongs_to(user_id, device_id))
            .cloned())
    }

    async fn insert_or_get(&self, session: Session) -> Result<Session, Report<StoreError>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions
            .values()
            .find(|s| s.is_active() && s.belongs_to(session.user_id(), session.device_id()))
        {
            return Ok(existing.clone());
        }
        sessions.insert(session.id(), session.clone());
        Ok(session)
    }

    async fn soft_delete_for_device(
        &self,
        user_id: UserId,
        device_id: &DeviceId,
    ) -> Result<u64, Report<StoreError>> {
        let mut sessions = self.sessions.lock().await;
        let mut revoked = 0;
        for session in sessions
            .values_mut()
            .filter(|s| s.is_active() && s.belongs_to(user_id, device_id))
        {
            session.revoke();
            revoked += 1;
        }
        Ok(revoked)
    }
}
