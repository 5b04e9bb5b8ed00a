//! Authentication and request-metadata extractors for Axum.

use authgate_access::{AuthenticatedUser, SessionMetadata};
use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;

/// Extractor for requiring an authenticated user.
///
/// Runs the bearer token through verification, session liveness and user
/// lookup. Any failure rejects the request as unauthorized.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let user = app_state.auth.authorize(header).await?;
        Ok(RequireAuth(user))
    }
}

/// Client IP and user agent of the request.
pub struct ClientMetadata(pub SessionMetadata);

impl<S> FromRequestParts<S> for ClientMetadata
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let ip_address = client_ip(&parts.headers, peer)
            .map(|ip| ip.to_string())
            .unwrap_or_default();
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(ClientMetadata(SessionMetadata::new(ip_address, user_agent)))
    }
}

/// First `X-Forwarded-For` entry, then `X-Real-IP`, then the socket peer.
///
/// A candidate that is not an IP address is skipped.
fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    let header_ip = |name: &str, first_entry: bool| {
        let value = headers.get(name)?.to_str().ok()?;
        let candidate = if first_entry {
            value.split(',').next()?
        } else {
            value
        };
        candidate.trim().parse::<IpAddr>().ok()
    };

    header_ip("x-forwarded-for", true)
        .or_else(|| header_ip("x-real-ip", false))
        .or(peer)
}
