//! Session lifecycle: create-or-reuse, lookup and revocation.

use authgate_core::{DeviceId, SessionId, UserId};
use rootcause::prelude::Report;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::instrument;

use crate::error::AuthenticationError;
use crate::geo::{Geolocator, UNKNOWN_LOCATION};
use crate::session::{Session, SessionMetadata};
use crate::store::SessionStore;

/// Manages device-scoped sessions.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    geolocator: Arc<dyn Geolocator>,
}

impl SessionManager {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>, geolocator: Arc<dyn Geolocator>) -> Self {
        Self {
            sessions,
            geolocator,
        }
    }

    /// Returns the active session for this user and device, creating one if
    /// none exists.
    ///
    /// An existing session is returned as stored; its metadata is not
    /// refreshed. New sessions record the request's IP, user agent and a
    /// best-effort location.
    #[instrument(skip_all, fields(user_id = %user_id, device_id = %device_id))]
    pub async fn create_or_get(
        &self,
        user_id: UserId,
        device_id: DeviceId,
        metadata: SessionMetadata,
    ) -> Result<Session, Report<AuthenticationError>> {
        if let Some(existing) = self
            .sessions
            .find_for_device(user_id, &device_id)
            .await
            .map_err(|e| e.context(AuthenticationError::Storage))?
        {
            tracing::debug!(session_id = %existing.id(), "reusing active session");
            return Ok(existing);
        }

        let location = self.locate(&metadata.ip_address).await;
        let session = self
            .sessions
            .insert_or_get(Session::new(user_id, device_id, metadata, Some(location)))
            .await
            .map_err(|e| e.context(AuthenticationError::Storage))?;

        tracing::info!(session_id = %session.id(), "session established");
        Ok(session)
    }

    /// Returns the active session with this id.
    pub async fn get_by_id(&self, id: SessionId) -> Result<Session, Report<AuthenticationError>> {
        self.sessions
            .find_by_id(id)
            .await
            .map_err(|e| e.context(AuthenticationError::Storage))?
            .ok_or_else(|| {
                AuthenticationError::SessionNotFound {
                    session_id: id.to_string(),
                }
                .into()
            })
    }

    /// Revokes the user's active session on this device. Revoking a session
    /// that does not exist succeeds.
    #[instrument(skip_all, fields(user_id = %user_id, device_id = %device_id))]
    pub async fn revoke_by(
        &self,
        user_id: UserId,
        device_id: &DeviceId,
    ) -> Result<(), Report<AuthenticationError>> {
        let revoked = self
            .sessions
            .soft_delete_for_device(user_id, device_id)
            .await
            .map_err(|e| e.context(AuthenticationError::Storage))?;

        tracing::info!(revoked, "sessions revoked");
        Ok(())
    }

    async fn locate(&self, ip: &str) -> String {
        if ip.parse::<IpAddr>().is_err() {
            tracing::debug!("no usable client address, recording unknown location");
            return UNKNOWN_LOCATION.to_string();
        }

        match self.geolocator.locate(ip).await {
            Ok(location) => location,
            Err(report) => {
                tracing::warn!(error = %report, "geolocation failed, recording unknown location");
                UNKNOWN_LOCATION.to_string()
            }
        }
    }
}
