use async_trait::async_trait;

use storefront_core::analytics::{AggregateQuery, AggregateResult, EventStore};
use storefront_core::event::NewEvent;

use crate::DuckDbBackend;

#[async_trait]
impl EventStore for DuckDbBackend {
    async fn insert_events(&self, events: &[NewEvent]) -> anyhow::Result<()> {
        DuckDbBackend::insert_events(self, events).await
    }

    async fn aggregate(&self, query: &AggregateQuery) -> anyhow::Result<AggregateResult> {
        crate::queries::aggregate::aggregate_inner(self, query).await
    }
}
