//! Administrator accounts and their bearer sessions.

use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use sqlx::SqlitePool;

use super::StoreError;
use crate::types::Admin;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

const SESSION_TOKEN_LEN: usize = 64;
const MAX_USERNAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 100;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    password_hash: String,
    email: Option<String>,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            is_active: row.is_active,
            last_login: row.last_login,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    expires_at: DateTime<Utc>,
    #[sqlx(flatten)]
    admin: AdminRow,
}

/// Random alphanumeric token used as the admin session id.
pub fn generate_token(len: usize) -> String {
    rand::rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

fn invalid(field: &str, message: &str) -> StoreError {
    StoreError::Invalid { field: field.to_string(), message: message.to_string() }
}

/// Repository for admin accounts and sessions.
pub struct AdminRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AdminRepository<'a> {
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates an active admin with a bcrypt-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for malformed input and
    /// `StoreError::Conflict` when the username is taken.
    pub async fn create(&self, username: &str, password: &str, email: Option<&str>) -> Result<Admin, StoreError> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(invalid("username", "must be 1-50 characters"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid("password", "must be at least 8 characters"));
        }
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if let Some(e) = email {
            if e.chars().count() > MAX_EMAIL_LEN || !e.contains('@') {
                return Err(invalid("email", "must be a valid address of at most 100 characters"));
            }
        }

        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, HASH_COST)).await??;

        let res = sqlx::query_as::<_, AdminRow>(
            r#"INSERT INTO admins (username, password_hash, email)
               VALUES (?1, ?2, ?3)
               RETURNING id, username, password_hash, email, is_active, last_login, created_at"#,
        )
        .bind(username)
        .bind(hash)
        .bind(email)
        .fetch_one(self.pool)
        .await;

        match res {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict(format!("admin '{}' already exists", username)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins").fetch_one(self.pool).await?;
        Ok(n)
    }

    /// Checks a username/password pair against active accounts and stamps `last_login`.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<Admin>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"SELECT id, username, password_hash, email, is_active, last_login, created_at
               FROM admins WHERE username = ?1 AND is_active = 1"#,
        )
        .bind(username.trim())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let password = password.to_string();
        let hash = row.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        if !valid {
            return Ok(None);
        }

        let now = Utc::now();
        sqlx::query("UPDATE admins SET last_login = ?1 WHERE id = ?2")
            .bind(now)
            .bind(row.id)
            .execute(self.pool)
            .await?;

        let mut admin: Admin = row.into();
        admin.last_login = Some(now);
        Ok(Some(admin))
    }

    pub async fn set_active(&self, admin_id: i64, active: bool) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE admins SET is_active = ?1 WHERE id = ?2")
            .bind(active)
            .bind(admin_id)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Issues a new session token valid for `ttl`.
    pub async fn create_session(&self, admin_id: i64, ttl: Duration) -> Result<String, StoreError> {
        let expires_at = Utc::now().checked_add_signed(ttl).ok_or_else(|| StoreError::Invalid {
            field: "ttl".to_string(),
            message: "session expiry out of range".to_string(),
        })?;
        let token = generate_token(SESSION_TOKEN_LEN);
        sqlx::query("INSERT INTO admin_sessions (id, admin_id, expires_at) VALUES (?1, ?2, ?3)")
            .bind(&token)
            .bind(admin_id)
            .bind(expires_at)
            .execute(self.pool)
            .await?;
        Ok(token)
    }

    /// Resolves a session token to its active admin. Expired sessions are deleted.
    pub async fn find_by_session(&self, token: &str) -> Result<Option<Admin>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"SELECT s.expires_at, a.id, a.username, a.password_hash, a.email,
                      a.is_active, a.last_login, a.created_at
               FROM admin_sessions s
               INNER JOIN admins a ON a.id = s.admin_id
               WHERE s.id = ?1"#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if row.expires_at <= Utc::now() {
            self.delete_session(token).await?;
            return Ok(None);
        }
        if !row.admin.is_active {
            return Ok(None);
        }
        Ok(Some(row.admin.into()))
    }

    pub async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM admin_sessions WHERE id = ?1").bind(token).execute(self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?1")
            .bind(Utc::now())
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
