//! PostgreSQL-backed store.
//!
//! Every state transition is a single statement. The open-session invariant
//! rides on the `duty_sessions_one_open_per_user` partial unique index and
//! user provisioning on `users_external_id_key`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CloseOutcome, DutyStore, StoreError, StoreResult, UserStore};
use crate::models::duty::{DutySession, NewDutySession};
use crate::models::user::{NewUser, Role, User, UserProfile};

/// Partial unique index guarding "one open session per user".
const OPEN_SESSION_INDEX: &str = "duty_sessions_one_open_per_user";

const USER_COLUMNS: &str = "id, external_id, email, first_name, last_name, username, \
     phone_number, role::text AS role, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_id, location_id, shift_id, clock_in_time, \
     clock_out_time, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    phone_number: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("user {}: {e}", row.id)))?;
        Ok(User {
            id: row.id,
            external_id: row.external_id,
            profile: UserProfile {
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
                username: row.username,
                phone_number: row.phone_number,
            },
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    location_id: Option<Uuid>,
    shift_id: Option<Uuid>,
    clock_in_time: DateTime<Utc>,
    clock_out_time: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for DutySession {
    fn from(row: SessionRow) -> Self {
        DutySession {
            id: row.id,
            user_id: row.user_id,
            location_id: row.location_id,
            shift_id: row.shift_id,
            clock_in_time: row.clock_in_time,
            clock_out_time: row.clock_out_time,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Store backed by a shared PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, external_id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }
}

/// Classify constraint violations raised by the clock-in insert.
fn map_insert_error(e: sqlx::Error, user_id: Uuid) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() && db.constraint() == Some(OPEN_SESSION_INDEX) {
            return StoreError::OpenSessionExists(user_id);
        }
        if db.is_foreign_key_violation() {
            let constraint = db.constraint().unwrap_or("foreign key").to_string();
            return StoreError::MissingReference(constraint);
        }
    }
    StoreError::Db(e)
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        self.fetch_user(external_id).await
    }

    async fn insert_user_if_absent(&self, new_user: &NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users \
             (external_id, email, first_name, last_name, username, phone_number, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::user_role) \
             ON CONFLICT (external_id) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new_user.external_id)
            .bind(&new_user.profile.email)
            .bind(&new_user.profile.first_name)
            .bind(&new_user.profile.last_name)
            .bind(&new_user.profile.username)
            .bind(&new_user.profile.phone_number)
            .bind(new_user.role.as_str())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return User::try_from(row);
        }

        // Lost the race: another request created the row first.
        self.fetch_user(&new_user.external_id).await?.ok_or_else(|| {
            StoreError::Corrupt(format!(
                "user {} conflicted on insert but is not readable",
                new_user.external_id
            ))
        })
    }

    async fn upsert_user_profile(
        &self,
        external_id: &str,
        profile: &UserProfile,
        role_if_new: Role,
    ) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users \
             (external_id, email, first_name, last_name, username, phone_number, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::user_role) \
             ON CONFLICT (external_id) DO UPDATE SET \
               email = EXCLUDED.email, \
               first_name = EXCLUDED.first_name, \
               last_name = EXCLUDED.last_name, \
               username = EXCLUDED.username, \
               phone_number = EXCLUDED.phone_number, \
               updated_at = now() \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(external_id)
            .bind(&profile.email)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.username)
            .bind(&profile.phone_number)
            .bind(role_if_new.as_str())
            .fetch_one(&self.pool)
            .await?;
        User::try_from(row)
    }
}

#[async_trait]
impl DutyStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn location_is_active(&self, location_id: Uuid) -> StoreResult<bool> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1 AND is_active)",
        )
        .bind(location_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(active)
    }

    async fn shift_is_open(&self, shift_id: Uuid) -> StoreResult<bool> {
        let open = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM shifts WHERE id = $1 AND archived_at IS NULL)",
        )
        .bind(shift_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(open)
    }

    async fn find_open_session(&self, user_id: Uuid) -> StoreResult<Option<DutySession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM duty_sessions \
             WHERE user_id = $1 AND clock_out_time IS NULL"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DutySession::from))
    }

    async fn insert_open_session(
        &self,
        new_session: &NewDutySession,
    ) -> StoreResult<DutySession> {
        let sql = format!(
            "INSERT INTO duty_sessions (id, user_id, location_id, shift_id, clock_in_time) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(new_session.id)
            .bind(new_session.user_id)
            .bind(new_session.location_id)
            .bind(new_session.shift_id)
            .bind(new_session.clock_in_time)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, new_session.user_id))?;
        Ok(row.into())
    }

    async fn close_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<CloseOutcome> {
        let sql = format!(
            "UPDATE duty_sessions \
             SET clock_out_time = GREATEST($3, clock_in_time), \
                 notes = COALESCE($4, notes), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND clock_out_time IS NULL \
             RETURNING {SESSION_COLUMNS}"
        );
        let closed = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .bind(user_id)
            .bind(now)
            .bind(notes)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = closed {
            return Ok(CloseOutcome::Closed(row.into()));
        }

        // Sessions never reopen, so an owned row that did not match is closed.
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM duty_sessions WHERE id = $1 AND user_id = $2)",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(if owned {
            CloseOutcome::AlreadyClosed
        } else {
            CloseOutcome::NotFound
        })
    }
}
