use std::time::Duration;

use crate::analytics::AnonymousSubjects;
use crate::window::WindowTimezone;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    pub cors_origins: Vec<String>,
    /// Overrides the secret stored in the `settings` table when set.
    pub jwt_secret: Option<String>,
    pub session_hours: u32,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub argon2_memory_kb: u32,
    pub timezone: WindowTimezone,
    pub anonymous_subjects: AnonymousSubjects,
    pub buffer_flush_interval_ms: u64,
    pub buffer_max_size: usize,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("STOREFRONT_PORT")
                .unwrap_or_else(|_| "5005".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("STOREFRONT_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string()),
            duckdb_memory_limit: std::env::var("STOREFRONT_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            cors_origins: std::env::var("STOREFRONT_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]),
            jwt_secret: non_empty_var("STOREFRONT_JWT_SECRET"),
            session_hours: std::env::var("STOREFRONT_SESSION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            admin_email: non_empty_var("STOREFRONT_ADMIN_EMAIL"),
            admin_password: non_empty_var("STOREFRONT_ADMIN_PASSWORD"),
            argon2_memory_kb: std::env::var("STOREFRONT_ARGON2_MEMORY_KB")
                .unwrap_or_else(|_| "65536".to_string())
                .parse()
                .unwrap_or(65536),
            timezone: match non_empty_var("STOREFRONT_TIMEZONE") {
                Some(raw) => WindowTimezone::parse(&raw)?,
                None => WindowTimezone::Local,
            },
            anonymous_subjects: match non_empty_var("STOREFRONT_ANONYMOUS_SUBJECTS") {
                Some(raw) => AnonymousSubjects::parse(&raw)?,
                None => AnonymousSubjects::default(),
            },
            buffer_flush_interval_ms: positive_or(
                std::env::var("STOREFRONT_BUFFER_FLUSH_MS").ok().as_deref(),
                1000,
            ),
            buffer_max_size: positive_or(
                std::env::var("STOREFRONT_BUFFER_MAX").ok().as_deref(),
                500,
            ),
            body_limit_bytes: std::env::var("STOREFRONT_BODY_LIMIT_BYTES")
                .unwrap_or_else(|_| (5 * 1024 * 1024).to_string())
                .parse()
                .unwrap_or(5 * 1024 * 1024),
        })
    }

    /// Never zero: `tokio::time::interval` panics on a zero period.
    pub fn buffer_flush_interval(&self) -> Duration {
        Duration::from_millis(self.buffer_flush_interval_ms.max(1))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a count or duration that must be at least 1. Missing, malformed and
/// zero values all fall back to `default`.
fn positive_or<T>(raw: Option<&str>, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
        .unwrap_or(default)
}
