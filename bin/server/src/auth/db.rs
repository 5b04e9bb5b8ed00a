//! Postgres stores for users and sessions.

use async_trait::async_trait;
use authgate_access::{Provider, Session, SessionStore, StoreError, User, UserStore};
use authgate_core::{DeviceId, SessionId, UserId};
use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

const USER_COLUMNS: &str = "id, name, email, avatar_url, is_email_verified, provider, \
     provider_user_id, created_at, updated_at, deleted_at";

const SESSION_COLUMNS: &str = "id, user_id, device_id, ip_address, user_agent, location, \
     last_active_at, created_at, updated_at, deleted_at";

fn query_error(e: sqlx::Error) -> Report<StoreError> {
    StoreError::Query {
        reason: e.to_string(),
    }
    .into()
}

fn decode_error(reason: String) -> Report<StoreError> {
    StoreError::Decode { reason }.into()
}

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    name: Option<String>,
    email: String,
    avatar_url: Option<String>,
    is_email_verified: bool,
    provider: String,
    provider_user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, Report<StoreError>> {
        let id = UserId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid user id '{}': {e}", self.id)))?;
        let provider = Provider::from_str(&self.provider)
            .map_err(|e| decode_error(format!("invalid provider for user '{}': {e}", self.id)))?;

        Ok(User::with_all_fields(
            id,
            self.name,
            self.email,
            self.avatar_url,
            self.is_email_verified,
            provider,
            self.provider_user_id,
            self.created_at,
            self.updated_at,
            self.deleted_at,
        ))
    }
}

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    device_id: String,
    ip_address: String,
    user_agent: String,
    location: Option<String>,
    last_active_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, Report<StoreError>> {
        let id = SessionId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid session id '{}': {e}", self.id)))?;
        let user_id = UserId::from_str(&self.user_id)
            .map_err(|e| decode_error(format!("invalid user id '{}': {e}", self.user_id)))?;

        Ok(Session::with_all_fields(
            id,
            user_id,
            DeviceId::new(self.device_id),
            self.ip_address,
            self.user_agent,
            self.location,
            self.last_active_at,
            self.created_at,
            self.updated_at,
            self.deleted_at,
        ))
    }
}

/// User store backed by the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(UserRow::try_into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Report<StoreError>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(UserRow::try_into_user).transpose()
    }

    async fn insert_or_get(&self, user: User) -> Result<User, Report<StoreError>> {
        // Losing the race on the active-email index inserts nothing; the
        // winner is read back below.
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, avatar_url, is_email_verified, provider,
                               provider_user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (email) WHERE deleted_at IS NULL DO NOTHING
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.name())
        .bind(user.email())
        .bind(user.avatar_url())
        .bind(user.is_email_verified())
        .bind(user.provider().as_str())
        .bind(user.provider_user_id())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(query_error)?
        .rows_affected();

        if inserted == 1 {
            return Ok(user);
        }

        self.find_by_email(user.email()).await?.ok_or_else(|| {
            decode_error(format!(
                "conflicting user for '{}' vanished before re-read",
                user.email()
            ))
        })
    }
}

/// Session store backed by the `user_sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, Report<StoreError>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(SessionRow::try_into_session).transpose()
    }

    async fn find_for_device(
        &self,
        user_id: UserId,
        device_id: &DeviceId,
    ) -> Result<Option<Session>, Report<StoreError>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions \
             WHERE user_id = $1 AND device_id = $2 AND deleted_at IS NULL"
        ))
        .bind(user_id.to_string())
        .bind(device_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        row.map(SessionRow::try_into_session).transpose()
    }

    async fn insert_or_get(&self, session: Session) -> Result<Session, Report<StoreError>> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_sessions (id, user_id, device_id, ip_address, user_agent, location,
                                       last_active_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, device_id) WHERE deleted_at IS NULL DO NOTHING
            "#,
        )
        .bind(session.id().to_string())
        .bind(session.user_id().to_string())
        .bind(session.device_id().as_str())
        .bind(session.ip_address())
        .bind(session.user_agent())
        .bind(session.location())
        .bind(session.last_active_at())
        .bind(session.created_at())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(query_error)?
        .rows_affected();

        if inserted == 1 {
            return Ok(session);
        }

        self.find_for_device(session.user_id(), session.device_id())
            .await?
            .ok_or_else(|| {
                decode_error(format!(
                    "conflicting session for device '{}' vanished before re-read",
                    session.device_id()
                ))
            })
    }

    async fn soft_delete_for_device(
        &self,
        user_id: UserId,
        device_id: &DeviceId,
    ) -> Result<u64, Report<StoreError>> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE user_id = $1 AND device_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id.to_string())
        .bind(device_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(result.rows_affected())
    }
}
