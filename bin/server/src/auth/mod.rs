//! Authentication module for the authgate server.
//!
//! This module provides:
//! - OAuth sign-in against the supported identity providers
//! - Postgres-backed user and session stores
//! - The `AuthService` orchestrating sign-in, refresh and sign-out
//! - Authentication extractors for Axum routes
//!
//! # Credential Model
//!
//! Access and refresh tokens are stateless signed claims bound to a session.
//! The session row is the only revocation point: every protected request and
//! every refresh re-reads it, so signing out invalidates all outstanding
//! tokens for that device at once.

pub mod db;
pub mod geo;
pub mod middleware;
pub mod provider;
pub mod routes;
pub mod service;

use crate::health::HealthProbe;
use std::sync::Arc;

pub use middleware::{ClientMetadata, RequireAuth};
pub use provider::{IdentityProviders, OAuthProviders};
pub use routes::{callback, me, refresh, sign_in, sign_out};
pub use service::AuthService;

/// Settings for the `device_id` cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub max_age: time::Duration,
    pub secure: bool,
}

/// Shared application state.
pub struct AppState {
    /// Authentication flows.
    pub auth: AuthService,
    /// Device cookie settings.
    pub cookies: CookieSettings,
    /// Dependencies checked by the health endpoint, in order.
    pub health_probes: Vec<Arc<dyn HealthProbe>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        auth: AuthService,
        cookies: CookieSettings,
        health_probes: Vec<Arc<dyn HealthProbe>>,
    ) -> Self {
        Self {
            auth,
            cookies,
            health_probes,
        }
    }
}
