//! Event store abstraction and the typed aggregation query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventType, NewEvent};
use crate::window::{resolve_window_start, Period, WindowTimezone};

/// External metric name, mapped onto an internal [`EventType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Views,
    Clicks,
}

impl Metric {
    /// `None` and the empty string select `views`. Anything other than
    /// `views` reads as `clicks`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("views") => Self::Views,
            Some(_) => Self::Clicks,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Metric::Views => EventType::View,
            Metric::Clicks => EventType::Click,
        }
    }
}

/// How events without a subject contribute to the distinct-subject count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymousSubjects {
    /// Anonymous events are counted in `total` but ignored for uniqueness.
    #[default]
    Exclude,
    /// All anonymous events together count as one extra subject.
    Bucket,
}

impl AnonymousSubjects {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "exclude" => Ok(Self::Exclude),
            "bucket" => Ok(Self::Bucket),
            other => Err(format!(
                "invalid anonymous subject policy '{other}' (expected exclude or bucket)"
            )),
        }
    }
}

/// Count of matching events plus the number of distinct subjects among them.
///
/// Wire name for `unique_subjects` is `uniqueUsers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    pub total: i64,
    #[serde(rename = "uniqueUsers")]
    pub unique_subjects: i64,
}

/// A single-group aggregation over the event store:
/// filter `event_type = ? AND created_at >= ?`, then reduce to
/// `COUNT(*)` and the distinct-subject count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    pub event_type: EventType,
    pub since: DateTime<Utc>,
    pub anonymous: AnonymousSubjects,
}

impl AggregateQuery {
    pub fn new(event_type: EventType, since: DateTime<Utc>) -> Self {
        Self {
            event_type,
            since,
            anonymous: AnonymousSubjects::default(),
        }
    }

    /// Build the query for a metric over the window selected by `period`.
    pub fn for_window(metric: Metric, period: Period, timezone: &WindowTimezone) -> Self {
        Self::new(metric.event_type(), resolve_window_start(period, timezone))
    }

    pub fn anonymous(mut self, policy: AnonymousSubjects) -> Self {
        self.anonymous = policy;
        self
    }
}

/// Append-only event storage plus the one read path analytics needs.
///
/// `created_at` and `id` are assigned by the implementation at insert time.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Insert a batch in one atomic write. An empty batch is a no-op.
    async fn insert_events(&self, events: &[NewEvent]) -> anyhow::Result<()>;

    async fn insert_event(&self, event: &NewEvent) -> anyhow::Result<()> {
        self.insert_events(std::slice::from_ref(event)).await
    }

    /// Run the aggregation. No matching rows yields `{0, 0}`, not an error.
    async fn aggregate(&self, query: &AggregateQuery) -> anyhow::Result<AggregateResult>;
}
