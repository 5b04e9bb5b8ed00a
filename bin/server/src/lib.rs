//! authgate HTTP server.
//!
//! Wires the credential and access crates to Postgres, Redis, the identity
//! providers and an axum router. Every route is mounted under the configured
//! API prefix.

pub mod auth;
pub mod config;
pub mod error;
pub mod health;

use authgate_access::{IdentityResolver, SessionManager};
use authgate_credentials::{StateTokens, TokenService};
use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    routing::{get, post},
};
use rootcause::prelude::Report;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::{
    AppState, AuthService, CookieSettings, OAuthProviders,
    db::{PgSessionStore, PgUserStore},
    geo::IpApiGeolocator,
};
use crate::config::{LogFormat, ServerConfig};
use crate::error::{ApiError, ServerError};
use crate::health::{HealthProbe, PostgresProbe, RedisProbe};

/// Builds the application router.
pub fn build_router(state: Arc<AppState>, api_prefix: &str, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/auth/sign-in/{provider}", get(auth::sign_in))
        .route("/auth/callback/{provider}", get(auth::callback))
        .route("/auth/me", get(auth::me))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/sign-out", get(auth::sign_out));

    let prefix = api_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    with_request_timeout(app.fallback(not_found), request_timeout)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bounds every request by `timeout`. An elapsed request is dropped, which
/// cancels its in-flight outbound calls, and answers with the error envelope.
fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(request_failed))
            .layer(tower::timeout::TimeoutLayer::new(timeout)),
    )
}

async fn request_failed(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request timed out");
    } else {
        tracing::error!(error = %err, "request failed in middleware");
    }
    ApiError::Internal
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(log_level: &str, log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},tower_http=debug")));

    let (json, pretty) = match log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

/// Connects every dependency and serves until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if a dependency cannot be set up or the listener fails.
pub async fn run(config: ServerConfig) -> Result<(), Report<ServerError>> {
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| ServerError::Database {
            reason: e.to_string(),
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| ServerError::Database {
            reason: e.to_string(),
        })?;

    let redis = redis::Client::open(config.redis_url.as_str()).map_err(|e| ServerError::Cache {
        reason: e.to_string(),
    })?;

    let request_timeout = Duration::from_secs(config.request_timeout_seconds);
    let provider_http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(request_timeout)
        .user_agent(concat!("authgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ServerError::HttpClient {
            reason: e.to_string(),
        })?;

    let providers = OAuthProviders::new(&config.providers, provider_http)?;
    let geolocator = IpApiGeolocator::new(&config.geolocation)?;

    let secret = &config.auth.jwt_secret;
    if secret.is_empty() {
        return Err(ServerError::Config {
            reason: "auth.jwt_secret must not be empty".to_string(),
        }
        .into());
    }

    let auth = AuthService::new(
        StateTokens::new(secret, chrono::Duration::minutes(config.auth.state_ttl_minutes)),
        TokenService::new(
            secret,
            chrono::Duration::minutes(config.auth.access_ttl_minutes),
            chrono::Duration::days(config.auth.refresh_ttl_days),
        ),
        Arc::new(providers),
        IdentityResolver::new(Arc::new(PgUserStore::new(db_pool.clone()))),
        SessionManager::new(
            Arc::new(PgSessionStore::new(db_pool.clone())),
            Arc::new(geolocator),
        ),
    );

    let cookies = CookieSettings {
        max_age: time::Duration::minutes(config.auth.device_cookie_max_age_minutes),
        secure: config.auth.secure_cookies,
    };
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(PostgresProbe::new(db_pool)),
        Arc::new(RedisProbe::new(redis)),
    ];

    let state = Arc::new(AppState::new(auth, cookies, probes));
    let app = build_router(state, &config.api_prefix, request_timeout);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| ServerError::Serve {
            reason: format!("failed to bind {}: {e}", config.listen_addr),
        })?;

    tracing::info!("listening on http://{}{}", config.listen_addr, config.api_prefix);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ServerError::Serve {
        reason: e.to_string(),
    })?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
