#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;

use storefront_core::analytics::{AggregateQuery, AggregateResult, AnonymousSubjects, EventStore};
use storefront_core::config::Config;
use storefront_core::event::NewEvent;
use storefront_core::window::WindowTimezone;
use storefront_duckdb::{DuckDbBackend, UserRecord};
use storefront_server::auth::jwt::encode_jwt;
use storefront_server::auth::password::hash_password;
use storefront_server::state::AppState;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "strong_password_123";

/// Config with a fixed JWT secret and low argon2 memory for fast tests.
pub fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/storefront-test".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
        cors_origins: vec![],
        jwt_secret: Some(JWT_SECRET.to_string()),
        session_hours: 24,
        admin_email: None,
        admin_password: None,
        argon2_memory_kb: 4096,
        timezone: WindowTimezone::Local,
        anonymous_subjects: AnonymousSubjects::Exclude,
        buffer_flush_interval_ms: 60_000,
        buffer_max_size: 1000,
        body_limit_bytes: 1024 * 1024,
    }
}

pub fn setup() -> Arc<AppState> {
    setup_with(test_config())
}

pub fn setup_with(config: Config) -> Arc<AppState> {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    Arc::new(AppState::new(db, config))
}

/// State whose event store always fails; users and settings still live in
/// an in-memory DuckDB.
pub fn setup_failing_store() -> Arc<AppState> {
    setup_failing_store_with(test_config())
}

pub fn setup_failing_store_with(config: Config) -> Arc<AppState> {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("in-memory DuckDB"));
    Arc::new(AppState::with_event_store(db, Arc::new(FailingStore), config))
}

pub struct FailingStore;

#[async_trait]
impl EventStore for FailingStore {
    async fn insert_events(&self, _events: &[NewEvent]) -> anyhow::Result<()> {
        anyhow::bail!("store unavailable")
    }

    async fn aggregate(&self, _query: &AggregateQuery) -> anyhow::Result<AggregateResult> {
        anyhow::bail!("store unavailable")
    }
}

/// Insert a user and return a bearer token for them.
pub async fn user_token(state: &AppState, uid: &str, role: &str) -> String {
    state
        .db
        .create_user(&UserRecord {
            uid: uid.to_string(),
            email: format!("{uid}@example.com"),
            display_name: None,
            role: role.to_string(),
            password_hash: None,
        })
        .await
        .expect("create user");
    let (token, _) = encode_jwt(JWT_SECRET, uid, role, 1).expect("encode token");
    token
}

/// Insert the admin that `POST /admin/login` authenticates against.
pub async fn create_admin(state: &AppState) {
    let hash = hash_password(ADMIN_PASSWORD, 4096).expect("hash");
    state
        .db
        .create_user(&UserRecord {
            uid: "admin_1".to_string(),
            email: ADMIN_EMAIL.to_string(),
            display_name: Some("Admin".to_string()),
            role: "admin".to_string(),
            password_hash: Some(hash),
        })
        .await
        .expect("create admin");
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("build request")
}

pub fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

/// Rows of `events` as `(event_type, subject, path, identifier)`, oldest first.
pub async fn stored_events(
    state: &AppState,
) -> Vec<(String, Option<String>, Option<String>, Option<String>)> {
    let conn = state.db.conn_for_test().await;
    let mut stmt = conn
        .prepare(
            "SELECT event_type, subject, path, identifier FROM events \
             ORDER BY created_at, event_type",
        )
        .expect("prepare");
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("rows");
    rows
}
