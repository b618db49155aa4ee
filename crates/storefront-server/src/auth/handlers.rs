use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, state::AppState};

use super::jwt::encode_jwt;
use super::password::{check_admin_password, hash_password, verify_login_password};

const LOGIN_RATE_LIMIT_RETRY_AFTER_SECONDS: u64 = 15 * 60;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// The admin's email address.
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `POST /admin/login` — exchange admin credentials for a bearer token.
///
/// Rate limited: 5 failed attempts per 15 min per IP. Unknown emails,
/// non-admin users and wrong passwords all answer the same 401.
#[tracing::instrument(skip(state, headers, req))]
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = req?;
    let (Some(username), Some(password)) = (
        req.username.filter(|u| !u.trim().is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    };

    let client_ip = extract_client_ip(&headers);

    let allowed = state
        .db
        .check_login_rate_limit(&client_ip)
        .await
        .map_err(AppError::Internal)?;
    if !allowed {
        return Err(AppError::RateLimited {
            retry_after_seconds: LOGIN_RATE_LIMIT_RETRY_AFTER_SECONDS,
        });
    }

    let user = state
        .db
        .get_user_by_email(username.trim())
        .await
        .map_err(AppError::Internal)?
        .filter(|u| u.is_admin());

    let stored_hash = user.as_ref().and_then(|u| u.password_hash.as_deref());
    let verified = verify_login_password(&password, stored_hash, state.config.argon2_memory_kb);

    let Some(user) = user.filter(|_| verified) else {
        tracing::info!(ip = %client_ip, "Admin login rejected");
        state
            .db
            .record_login_attempt(&client_ip, false)
            .await
            .map_err(AppError::Internal)?;
        return Err(AppError::Unauthorized);
    };

    state
        .db
        .record_login_attempt(&client_ip, true)
        .await
        .map_err(AppError::Internal)?;

    let secret = state.jwt_secret().await.map_err(AppError::Internal)?;
    let (token, expires_at) = encode_jwt(&secret, &user.uid, &user.role, state.config.session_hours)
        .map_err(AppError::Internal)?;

    tracing::info!(uid = %user.uid, "Admin logged in");
    Ok(Json(json!({ "token": token, "expires_at": expires_at })))
}

/// Create the admin configured through `STOREFRONT_ADMIN_EMAIL` and
/// `STOREFRONT_ADMIN_PASSWORD` unless a user with that email already exists.
///
/// Does nothing when either variable is unset.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&state.config.admin_email, &state.config.admin_password)
    else {
        return Ok(());
    };

    check_admin_password(password)?;
    let hash = hash_password(password, state.config.argon2_memory_kb)?;
    if state.db.ensure_admin(email, &hash).await? {
        tracing::info!(email = %email, "Bootstrap admin created");
    } else {
        tracing::info!(email = %email, "Bootstrap admin already present");
    }
    Ok(())
}

/// Extract the real client IP from `X-Forwarded-For` (first entry).
///
/// Falls back to `"unknown"` when the header is absent.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
