use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

use super::jwt::decode_jwt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// The authenticated user behind a request, inserted into request
/// extensions by [`resolve_actor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub uid: String,
    pub role: Role,
}

/// Extractor for the optional [`Actor`]. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

impl MaybeActor {
    pub fn uid(&self) -> Option<String> {
        self.0.as_ref().map(|a| a.uid.clone())
    }
}

impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Actor>().cloned()))
    }
}

/// Resolve the caller from `Authorization: Bearer <jwt>` or the `token`
/// cookie.
///
/// Never rejects: a missing, invalid or expired token, or a token for a user
/// that no longer exists, leaves the request anonymous. Routes that need a
/// privileged caller add [`require_admin`].
pub async fn resolve_actor(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract synchronously so no borrow of `request` is held across await.
    let token = bearer_or_cookie_token(request.headers());

    if let Some(token) = token {
        if let Some(actor) = actor_for_token(&state, &token).await {
            request.extensions_mut().insert(actor);
        }
    }

    next.run(request).await
}

/// Reject the request unless [`resolve_actor`] attached an admin.
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<Actor>() {
        None => AppError::Unauthorized.into_response(),
        Some(actor) if actor.role != Role::Admin => AppError::Forbidden.into_response(),
        Some(_) => next.run(request).await,
    }
}

fn bearer_or_cookie_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str
                .split(';')
                .find_map(|c| c.trim().strip_prefix("token="))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// The stored role wins over the role claim, so demoting a user takes
/// effect before their token expires.
async fn actor_for_token(state: &AppState, token: &str) -> Option<Actor> {
    let secret = match state.jwt_secret().await {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load JWT secret");
            return None;
        }
    };

    let claims = match decode_jwt(token, &secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid token");
            return None;
        }
    };

    match state.db.get_user_by_uid(&claims.sub).await {
        Ok(Some(user)) => Some(Actor {
            role: Role::parse(&user.role),
            uid: user.uid,
        }),
        Ok(None) => {
            tracing::debug!(uid = %claims.sub, "Token subject not found");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed");
            None
        }
    }
}
