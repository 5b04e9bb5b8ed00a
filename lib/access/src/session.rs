//! Device-scoped login sessions.
//!
//! A session binds a user to one device. At most one active session exists
//! per (user, device) pair; signing in again from the same device reuses it.
//! Revocation is a soft delete, after which every credential referencing the
//! session is rejected.

use authgate_core::{DeviceId, SessionId, UserId};
use chrono::{DateTime, Utc};

/// Request metadata captured when a session is first created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    /// Client IP address as seen by the gateway.
    pub ip_address: String,
    /// The `User-Agent` header, possibly empty.
    pub user_agent: String,
}

impl SessionMetadata {
    #[must_use]
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// A login session for one user on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    device_id: DeviceId,
    ip_address: String,
    user_agent: String,
    /// "City, Country", or the unknown placeholder.
    location: Option<String>,
    last_active_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a new, unsaved session.
    #[must_use]
    pub fn new(
        user_id: UserId,
        device_id: DeviceId,
        metadata: SessionMetadata,
        location: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user_id,
            device_id,
            ip_address: metadata.ip_address,
            user_agent: metadata.user_agent,
            location,
            last_active_at: now,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Creates a session with all fields specified.
    ///
    /// Use this when reconstituting a session from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: SessionId,
        user_id: UserId,
        device_id: DeviceId,
        ip_address: String,
        user_agent: String,
        location: Option<String>,
        last_active_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            user_id,
            device_id,
            ip_address,
            user_agent,
            location,
            last_active_at,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
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

    /// Returns true if the session is not revoked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns true if this session belongs to `user_id` on `device_id`.
    #[must_use]
    pub fn belongs_to(&self, user_id: UserId, device_id: &DeviceId) -> bool {
        self.user_id == user_id && &self.device_id == device_id
    }

    /// Soft-deletes the session.
    pub fn revoke(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}
