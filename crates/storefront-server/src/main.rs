use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use storefront_server::{auth::handlers::bootstrap_admin, state::AppState};

/// `storefront health` — liveness probe for container health checks.
///
/// Calls `GET http://localhost:$STOREFRONT_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("STOREFRONT_PORT").unwrap_or_else(|_| "5005".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefront_server=info".parse()?),
        )
        .json()
        .init();

    let cfg = storefront_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/storefront.db", cfg.data_dir);
    let db = storefront_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    if cfg.jwt_secret.is_none() {
        db.ensure_jwt_secret().await?;
        info!("Using JWT secret stored in settings (STOREFRONT_JWT_SECRET unset)");
    }

    let state = Arc::new(AppState::new(db, cfg.clone()));

    if let Err(e) = bootstrap_admin(&state).await {
        tracing::error!(error = %e, "Admin bootstrap failed");
    }

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_flush_loop().await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = storefront_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        timezone = ?cfg.timezone,
        anonymous_subjects = ?cfg.anonymous_subjects,
        "Storefront API listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    // Pending page views are written before exit.
    tokio::time::timeout(std::time::Duration::from_secs(5), state.flush_page_views())
        .await
        .ok();

    Ok(())
}
