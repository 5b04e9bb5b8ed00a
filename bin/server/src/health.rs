//! Liveness of the gateway's backing services.

use async_trait::async_trait;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rootcause::prelude::Report;
use serde::Serialize;
use sqlx::PgPool;
use std::fmt;
use std::sync::Arc;

use crate::auth::AppState;

/// A dependency failed its liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthError {
    pub dependency: &'static str,
    pub reason: String,
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unhealthy: {}", self.dependency, self.reason)
    }
}

impl std::error::Error for HealthError {}

/// One dependency check. Probes run in order and the first failure wins.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Short name used in the `"<name> error"` status.
    fn name(&self) -> &'static str;

    async fn check(&self) -> Result<(), Report<HealthError>>;
}

/// Runs `SELECT 1` against the pool.
pub struct PostgresProbe {
    pool: PgPool,
}

impl PostgresProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthProbe for PostgresProbe {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn check(&self) -> Result<(), Report<HealthError>> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                HealthError {
                    dependency: self.name(),
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

/// Sends `PING` over a fresh multiplexed connection.
pub struct RedisProbe {
    client: redis::Client,
}

impl RedisProbe {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for RedisProbe {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn check(&self) -> Result<(), Report<HealthError>> {
        let unhealthy = |e: redis::RedisError| -> Report<HealthError> {
            HealthError {
                dependency: self.name(),
                reason: e.to_string(),
            }
            .into()
        };

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unhealthy)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unhealthy)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: String,
}

/// Answers `{status:"ok"}`, or 500 with the first failing dependency.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    for probe in &state.health_probes {
        if let Err(report) = probe.check().await {
            tracing::error!(error = %report, "health check failed");
            let body = HealthStatus {
                status: format!("{} error", probe.name()),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    }

    Json(HealthStatus {
        status: "ok".to_string(),
    })
    .into_response()
}
