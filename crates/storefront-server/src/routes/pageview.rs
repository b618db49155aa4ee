use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use storefront_core::event::NewEvent;

use crate::{auth::Actor, state::AppState};

/// Log an implicit `view` for every request that is not excluded.
///
/// The view is queued on [`AppState::push_page_view`] and written later by
/// the flush task, so a slow or failing store never touches this request.
pub async fn log_page_view(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if !is_excluded(request.uri().path()) {
        let subject = request.extensions().get::<Actor>().map(|a| a.uid.clone());
        state.push_page_view(NewEvent::view(subject, path)).await;
    }

    next.run(request).await
}

/// Static assets, the analytics endpoints themselves and the liveness probe.
pub fn is_excluded(path: &str) -> bool {
    has_segment_prefix(path, "/_next")
        || has_segment_prefix(path, "/static")
        || path.starts_with("/api/analytics")
        || path.starts_with("/api/events")
        || path == "/health"
}

/// `prefix` followed by end of path or a non-word character, so `/static`
/// matches `/static/app.js` but not `/statically`.
fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_')),
        None => false,
    }
}
