use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use storefront_core::{
    analytics::{AggregateQuery, AggregateResult, Metric},
    window::Period,
};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub metric: Option<String>,
    pub period: Option<String>,
}

/// `GET /api/analytics?metric=views|clicks&period=day|month|quarter|year`
///
/// Admin only. `metric` defaults to `views` and any value other than `views`
/// counts clicks. `period` defaults to `day`; an unrecognised period means
/// "since the beginning of time".
///
/// Response is flat: `{ "total": 12, "uniqueUsers": 4 }`.
#[tracing::instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AggregateResult>, AppError> {
    let metric = Metric::parse(query.metric.as_deref());
    let period = query
        .period
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or("day");
    let period = Period::parse(Some(period));

    let aggregate = AggregateQuery::for_window(metric, period, &state.config.timezone);
    let result = state
        .aggregate(aggregate)
        .await
        .map_err(AppError::store("Analytics aggregation failed"))?;

    Ok(Json(result))
}
