/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `STOREFRONT_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit: the DuckDB default of 80% of system RAM is not acceptable for a
/// server process.
///
/// All timestamps are stored as naive UTC `TIMESTAMP` values written from
/// Rust, so results never depend on the DuckDB session time zone.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SETTINGS
-- ===========================================
-- Keys stored in this table:
--   'jwt_secret' – HS256 signing secret, generated on first use unless
--                  STOREFRONT_JWT_SECRET is set
--   'version'    – Database schema version
CREATE TABLE IF NOT EXISTS settings (
    key             VARCHAR PRIMARY KEY,
    value           VARCHAR NOT NULL
);

-- ===========================================
-- USERS (read by the actor resolver and admin login)
-- ===========================================
CREATE TABLE IF NOT EXISTS users (
    uid             VARCHAR PRIMARY KEY,
    email           VARCHAR NOT NULL UNIQUE,
    display_name    VARCHAR,
    role            VARCHAR NOT NULL DEFAULT 'user',   -- 'user' | 'admin'
    password_hash   VARCHAR,                           -- argon2id PHC string; NULL for storefront-only users
    created_at      TIMESTAMP NOT NULL,
    updated_at      TIMESTAMP NOT NULL
);

-- ===========================================
-- EVENTS (append-only)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR PRIMARY KEY,               -- UUID v4, assigned at insert
    event_type      VARCHAR NOT NULL CHECK (event_type IN ('view', 'click')),
    subject         VARCHAR,                           -- users.uid; NULL for anonymous traffic
    path            VARCHAR,
    identifier      VARCHAR,                           -- click label, e.g. 'add_to_cart'
    created_at      TIMESTAMP NOT NULL,                -- assigned at insert, never client-supplied
    CHECK (event_type <> 'click' OR (identifier IS NOT NULL AND length(identifier) > 0))
);

-- Windowed aggregation: type + created_at range
CREATE INDEX IF NOT EXISTS idx_events_type_time
    ON events(event_type, created_at DESC);

-- ===========================================
-- LOGIN ATTEMPTS
-- Rate limiter: SELECT COUNT(*) WHERE ip_address = ? AND attempted_at > ? AND succeeded = false
-- ===========================================
CREATE TABLE IF NOT EXISTS login_attempts (
    id           VARCHAR PRIMARY KEY,
    ip_address   VARCHAR NOT NULL,
    attempted_at TIMESTAMP NOT NULL,
    succeeded    BOOLEAN NOT NULL DEFAULT false
);
CREATE INDEX IF NOT EXISTS idx_login_attempts_ip_time
    ON login_attempts(ip_address, attempted_at DESC);
"#
    )
}

/// Format used for every `TIMESTAMP` value bound from Rust.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
