use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use storefront_core::event::ClickPayload;

use crate::{auth::MaybeActor, error::AppError, state::AppState};

/// `POST /api/events` — log an explicit click.
///
/// Body: `{ "type": "click", "identifier": "add_to_cart", "path": "/products/abc" }`.
/// `type` defaults to `"click"`; any other type, or a missing `identifier`,
/// is a 400 and nothing is stored. So is a body that is not a JSON object of
/// that shape. The subject is the resolved actor, if any.
///
/// ## Response
/// `201 Created` with an empty body.
#[tracing::instrument(skip(state, actor, payload))]
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    actor: MaybeActor,
    payload: Result<Json<ClickPayload>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(payload) = payload?;
    let event = payload.into_click(actor.uid())?;

    state
        .record_event(event)
        .await
        .map_err(AppError::store("Failed to log event"))?;

    Ok(StatusCode::CREATED)
}
