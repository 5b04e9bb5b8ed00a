//! Authentication routes: sign-in, callback, me, refresh and sign-out.

use authgate_access::User;
use authgate_core::DeviceId;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{AppState, ClientMetadata, CookieSettings, RequireAuth};
use crate::error::{ApiError, ApiResponse};

/// Device cookie name.
pub const DEVICE_COOKIE: &str = "device_id";

#[derive(Debug, Serialize)]
pub struct SignInData {
    url: String,
}

/// Query parameters for the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    state: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Serialize)]
pub struct CallbackData {
    access_token: String,
    refresh_token: String,
    device_id: DeviceId,
}

#[derive(Debug, Serialize)]
pub struct MeData {
    user: User,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshData {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

fn device_from(jar: &CookieJar) -> Option<DeviceId> {
    jar.get(DEVICE_COOKIE)
        .map(Cookie::value)
        .filter(|value| !value.is_empty())
        .map(DeviceId::from)
}

fn device_cookie(device_id: &DeviceId, settings: CookieSettings) -> Cookie<'static> {
    Cookie::build((DEVICE_COOKIE, device_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(settings.max_age)
        .build()
}

/// Returns the provider redirect URL for `provider`.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<ApiResponse<SignInData>, ApiError> {
    let url = state.auth.sign_in_url(&provider)?;
    Ok(ApiResponse::ok(SignInData { url }))
}

/// Completes sign-in, issuing a `device_id` cookie if the client has none.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    ClientMetadata(metadata): ClientMetadata,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<CallbackData>), ApiError> {
    let (device_id, jar) = match device_from(&jar) {
        Some(device_id) => (device_id, jar),
        None => {
            let device_id = DeviceId::generate();
            let jar = jar.add(device_cookie(&device_id, state.cookies));
            (device_id, jar)
        }
    };

    let pair = state
        .auth
        .callback(
            &provider,
            &query.state,
            &query.code,
            device_id.clone(),
            metadata,
        )
        .await?;

    Ok((
        jar,
        ApiResponse::ok(CallbackData {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            device_id,
        }),
    ))
}

/// Returns the authenticated user's profile.
pub async fn me(RequireAuth(auth): RequireAuth) -> ApiResponse<MeData> {
    ApiResponse::ok(MeData {
        user: auth.into_user(),
    })
}

/// Exchanges a refresh token for a new pair bound to the same session.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<ApiResponse<RefreshData>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected refresh body");
        ApiError::InvalidInput
    })?;

    let pair = state.auth.refresh(&body.refresh_token).await?;
    Ok(ApiResponse::ok(RefreshData {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Revokes the session of the cookie's device, or of the token's session.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    jar: CookieJar,
) -> Result<ApiResponse<Empty>, ApiError> {
    state.auth.sign_out(&auth, device_from(&jar)).await?;
    Ok(ApiResponse::ok(Empty {}))
}
