use anyhow::Result;
use chrono::{Duration, Utc};
use duckdb::OptionalExt;

use crate::backend::{rand_hex, sql_timestamp};
use crate::DuckDbBackend;

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub password_hash: Option<String>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

const USER_COLUMNS: &str = "uid, email, display_name, role, password_hash";

fn user_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<UserRecord> {
    Ok(UserRecord {
        uid: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        role: row.get(3)?,
        password_hash: row.get(4)?,
    })
}

impl DuckDbBackend {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?
            .query_row(duckdb::params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(result)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            duckdb::params![key, value],
        )?;
        Ok(())
    }

    /// Ensure a JWT secret exists in settings. If not, generate one.
    /// Returns the JWT secret.
    pub async fn ensure_jwt_secret(&self) -> Result<String> {
        if let Some(secret) = self.get_setting("jwt_secret").await? {
            return Ok(secret);
        }
        let secret = rand_hex(32);
        self.set_setting("jwt_secret", &secret).await?;
        Ok(secret)
    }

    pub async fn get_user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1"))?
            .query_row(duckdb::params![uid], user_from_row)
            .optional()?;
        Ok(result)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?
            .query_row(duckdb::params![email], user_from_row)
            .optional()?;
        Ok(result)
    }

    /// Insert a new user row. Fails if the `uid` or `email` is taken.
    pub async fn create_user(&self, user: &UserRecord) -> Result<()> {
        let now = sql_timestamp(&Utc::now());
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO users (uid, email, display_name, role, password_hash, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, CAST(?6 AS TIMESTAMP), CAST(?7 AS TIMESTAMP))"#,
            duckdb::params![
                user.uid,
                user.email,
                user.display_name,
                user.role,
                user.password_hash,
                now,
                now,
            ],
        )?;
        Ok(())
    }

    /// Create an admin with `email` unless a user with that email exists.
    ///
    /// Returns `true` when a new admin row was written.
    pub async fn ensure_admin(&self, email: &str, password_hash: &str) -> Result<bool> {
        if self.get_user_by_email(email).await?.is_some() {
            return Ok(false);
        }
        self.create_user(&UserRecord {
            uid: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: None,
            role: "admin".to_string(),
            password_hash: Some(password_hash.to_string()),
        })
        .await?;
        Ok(true)
    }

    /// Record a login attempt for rate limiting.
    pub async fn record_login_attempt(&self, ip: &str, succeeded: bool) -> Result<()> {
        let id = rand_hex(5);
        let now = sql_timestamp(&Utc::now());
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO login_attempts (id, ip_address, attempted_at, succeeded) \
             VALUES (?1, ?2, CAST(?3 AS TIMESTAMP), ?4)",
            duckdb::params![id, ip, now, succeeded],
        )?;
        Ok(())
    }

    /// Check if the IP may attempt a login (fewer than 5 failures in the
    /// last 15 minutes).
    pub async fn check_login_rate_limit(&self, ip: &str) -> Result<bool> {
        let cutoff = sql_timestamp(&(Utc::now() - Duration::minutes(15)));
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare(
                "SELECT COUNT(*) FROM login_attempts \
                 WHERE ip_address = ?1 \
                 AND attempted_at > CAST(?2 AS TIMESTAMP) \
                 AND succeeded = false",
            )?
            .query_row(duckdb::params![ip, cutoff], |row| row.get(0))?;
        Ok(count < 5)
    }
}
