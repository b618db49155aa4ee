use anyhow::Result;

use storefront_core::analytics::{AggregateQuery, AggregateResult, AnonymousSubjects};

use crate::backend::sql_timestamp;
use crate::DuckDbBackend;

/// Render the typed query to SQL. Only the reduction varies; the filter is
/// always `event_type = ?1 AND created_at >= ?2`.
///
/// `COUNT(subject)` skips NULLs, so `COUNT(*) > COUNT(subject)` means at
/// least one anonymous event matched.
pub(crate) fn aggregate_sql(query: &AggregateQuery) -> &'static str {
    match query.anonymous {
        AnonymousSubjects::Exclude => {
            "SELECT COUNT(*), COUNT(DISTINCT subject) \
             FROM events \
             WHERE event_type = ?1 AND created_at >= CAST(?2 AS TIMESTAMP)"
        }
        AnonymousSubjects::Bucket => {
            "SELECT COUNT(*), \
                    COUNT(DISTINCT subject) + CASE WHEN COUNT(*) > COUNT(subject) THEN 1 ELSE 0 END \
             FROM events \
             WHERE event_type = ?1 AND created_at >= CAST(?2 AS TIMESTAMP)"
        }
    }
}

pub async fn aggregate_inner(db: &DuckDbBackend, query: &AggregateQuery) -> Result<AggregateResult> {
    let conn = db.conn.lock().await;
    let since = sql_timestamp(&query.since);

    let (total, unique_subjects): (i64, i64) = conn.prepare(aggregate_sql(query))?.query_row(
        duckdb::params![query.event_type.as_str(), since],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(AggregateResult {
        total,
        unique_subjects,
    })
}

impl DuckDbBackend {
    pub async fn aggregate(&self, query: &AggregateQuery) -> Result<AggregateResult> {
        aggregate_inner(self, query).await
    }
}
