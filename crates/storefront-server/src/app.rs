use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — the storefront front-end origins, with credentials so
///    the `token` cookie is sent.
/// 3. `resolve_actor` — attaches the authenticated [`auth::Actor`], if any.
/// 4. `log_page_view` — queues a `view` event; needs the actor, so it runs
///    after `resolve_actor`.
///
/// `/api/analytics` additionally sits behind `require_admin`.
pub fn build_app(state: Arc<AppState>) -> Router {
    let analytics = Router::new()
        .route("/api/analytics", get(routes::analytics::get_analytics))
        .route_layer(middleware::from_fn(auth::middleware::require_admin));

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health))
        .route("/api/events", post(routes::events::record_event))
        .route("/admin/login", post(auth::handlers::admin_login))
        .merge(analytics)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            routes::pageview::log_page_view,
        ))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::middleware::resolve_actor,
        ))
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
