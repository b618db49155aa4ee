use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use storefront_core::{
    analytics::{AggregateQuery, AggregateResult, EventStore},
    config::Config,
    event::NewEvent,
};
use storefront_duckdb::DuckDbBackend;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// All fields are cheap to clone; heavy resources are wrapped in `Arc`.
pub struct AppState {
    /// The DuckDB backend, used for settings, users and login attempts.
    pub db: Arc<DuckDbBackend>,

    /// Where events are written and aggregated. The DuckDB backend in
    /// production; tests swap in other implementations.
    pub events: Arc<dyn EventStore>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Page views waiting for the background flush.
    ///
    /// Lock, push or drain, release. The store write never happens while the
    /// lock is held, so request handling is not blocked by a slow store.
    pub view_buffer: Arc<Mutex<Vec<NewEvent>>>,
}

impl AppState {
    /// Construct a new `AppState` whose event store is the DuckDB backend.
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let events: Arc<dyn EventStore> = db.clone();
        Self::with_event_store(db, events, config)
    }

    pub fn with_event_store(
        db: Arc<DuckDbBackend>,
        events: Arc<dyn EventStore>,
        config: Config,
    ) -> Self {
        Self {
            db,
            events,
            config: Arc::new(config),
            view_buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// HS256 secret: the configured one, else the one stored in settings
    /// (generated on first use).
    pub async fn jwt_secret(&self) -> anyhow::Result<String> {
        match &self.config.jwt_secret {
            Some(secret) => Ok(secret.clone()),
            None => self.db.ensure_jwt_secret().await,
        }
    }

    /// Write one explicit event straight to the store. Errors go back to the
    /// caller.
    pub async fn record_event(&self, event: NewEvent) -> anyhow::Result<()> {
        self.events.insert_event(&event).await
    }

    /// Queue a page view. Never waits on the store.
    ///
    /// Reaching `config.buffer_max_size` hands the flush to a spawned task so
    /// the calling request still returns immediately.
    pub async fn push_page_view(self: &Arc<Self>, event: NewEvent) {
        let should_flush = {
            let mut buf = self.view_buffer.lock().await;
            buf.push(event);
            buf.len() >= self.config.buffer_max_size
        };

        if should_flush {
            let state = Arc::clone(self);
            tokio::spawn(async move {
                state.flush_page_views().await;
            });
        }
    }

    /// Drain the buffer and write all pending page views in one batch.
    ///
    /// A failed write is logged and the batch is dropped.
    pub async fn flush_page_views(&self) {
        let batch: Vec<NewEvent> = {
            let mut buf = self.view_buffer.lock().await;
            std::mem::take(&mut *buf)
        };

        if batch.is_empty() {
            return;
        }

        match self.events.insert_events(&batch).await {
            Ok(()) => info!(count = batch.len(), "Page views flushed"),
            Err(e) => {
                error!(count = batch.len(), error = %e, "Page view flush failed, views dropped")
            }
        }
    }

    /// Background loop: flush page views on a fixed interval.
    ///
    /// Spawned from `main.rs`; runs until the process exits.
    pub async fn run_flush_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.buffer_flush_interval());
        loop {
            ticker.tick().await;
            self.flush_page_views().await;
        }
    }

    /// Run an aggregation with the configured anonymous-subject policy.
    pub async fn aggregate(&self, query: AggregateQuery) -> anyhow::Result<AggregateResult> {
        let query = query.anonymous(self.config.anonymous_subjects);
        self.events.aggregate(&query).await
    }
}
