use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use storefront_core::{
    analytics::{AggregateQuery, AggregateResult, AnonymousSubjects, EventStore, Metric},
    event::{EventType, NewEvent},
    window::{Period, WindowTimezone},
};
use storefront_duckdb::DuckDbBackend;

/// Insert an event row with an explicit `created_at`, bypassing the store's
/// own timestamp assignment so window boundaries can be tested.
async fn seed_event_at(
    db: &DuckDbBackend,
    event_type: EventType,
    subject: Option<&str>,
    created_at: DateTime<Utc>,
) {
    let conn = db.conn_for_test().await;
    let identifier = match event_type {
        EventType::Click => Some("add_to_cart"),
        EventType::View => None,
    };
    conn.execute(
        "INSERT INTO events (id, event_type, subject, path, identifier, created_at) \
         VALUES (?1, ?2, ?3, '/products/abc', ?4, CAST(?5 AS TIMESTAMP))",
        storefront_duckdb::duckdb::params![
            uuid::Uuid::new_v4().to_string(),
            event_type.as_str(),
            subject,
            identifier,
            created_at
                .naive_utc()
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
        ],
    )
    .expect("seed event");
}

fn day_query(event_type: EventType) -> AggregateQuery {
    AggregateQuery::for_window(
        match event_type {
            EventType::View => Metric::Views,
            EventType::Click => Metric::Clicks,
        },
        Period::Day,
        &WindowTimezone::Local,
    )
}

#[tokio::test]
async fn test_day_window_counts_recent_and_excludes_older_events() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let query = day_query(EventType::View);
    let inside = Utc::now();
    let before = query.since - Duration::minutes(1);

    // N = 5 recent views from K = 3 subjects.
    for subject in ["u1", "u1", "u2", "u3", "u3"] {
        seed_event_at(&db, EventType::View, Some(subject), inside).await;
    }
    // M = 4 views before the window start, including a brand new subject.
    for subject in ["u1", "u4", "u4", "u5"] {
        seed_event_at(&db, EventType::View, Some(subject), before).await;
    }

    let result = db.aggregate(&query).await.expect("aggregate");
    assert_eq!(
        result,
        AggregateResult {
            total: 5,
            unique_subjects: 3
        }
    );
}

#[tokio::test]
async fn test_window_start_is_inclusive() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let query = AggregateQuery::new(
        EventType::View,
        Utc::now() - Duration::hours(2),
    );
    seed_event_at(&db, EventType::View, Some("u1"), query.since).await;

    let result = db.aggregate(&query).await.expect("aggregate");
    assert_eq!(result.total, 1);
}

#[tokio::test]
async fn test_aggregate_filters_by_event_type() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let now = Utc::now();
    seed_event_at(&db, EventType::View, Some("u1"), now).await;
    seed_event_at(&db, EventType::Click, Some("u1"), now).await;
    seed_event_at(&db, EventType::Click, Some("u2"), now).await;

    let clicks = db
        .aggregate(&day_query(EventType::Click))
        .await
        .expect("aggregate clicks");
    assert_eq!(clicks.total, 2);
    assert_eq!(clicks.unique_subjects, 2);

    let views = db
        .aggregate(&day_query(EventType::View))
        .await
        .expect("aggregate views");
    assert_eq!(views.total, 1);
}

#[tokio::test]
async fn test_empty_store_returns_zeroes() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    for period in [Period::Day, Period::Month, Period::Quarter, Period::Year, Period::All] {
        for metric in [Metric::Views, Metric::Clicks] {
            let query = AggregateQuery::for_window(metric, period, &WindowTimezone::Local);
            let result = db.aggregate(&query).await.expect("aggregate");
            assert_eq!(result, AggregateResult::default(), "{metric:?} {period:?}");
        }
    }
}

#[tokio::test]
async fn test_unbounded_window_includes_everything() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    seed_event_at(&db, EventType::View, Some("u1"), Utc::now() - Duration::days(900)).await;
    seed_event_at(&db, EventType::View, Some("u2"), Utc::now()).await;

    let query = AggregateQuery::for_window(
        Metric::Views,
        Period::parse(Some("forever")),
        &WindowTimezone::Local,
    );
    let result = db.aggregate(&query).await.expect("aggregate");
    assert_eq!(result.total, 2);
    assert_eq!(result.unique_subjects, 2);
}

#[tokio::test]
async fn test_anonymous_subjects_excluded_by_default() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let now = Utc::now();
    seed_event_at(&db, EventType::View, Some("u1"), now).await;
    seed_event_at(&db, EventType::View, None, now).await;
    seed_event_at(&db, EventType::View, None, now).await;

    let result = db
        .aggregate(&day_query(EventType::View))
        .await
        .expect("aggregate");
    assert_eq!(result.total, 3);
    assert_eq!(result.unique_subjects, 1);
}

#[tokio::test]
async fn test_anonymous_subjects_bucket_counts_once() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let now = Utc::now();
    seed_event_at(&db, EventType::View, Some("u1"), now).await;
    seed_event_at(&db, EventType::View, None, now).await;
    seed_event_at(&db, EventType::View, None, now).await;

    let query = day_query(EventType::View).anonymous(AnonymousSubjects::Bucket);
    let result = db.aggregate(&query).await.expect("aggregate");
    assert_eq!(result.total, 3);
    assert_eq!(result.unique_subjects, 2);

    // No anonymous rows: the bucket adds nothing.
    let clicks = day_query(EventType::Click).anonymous(AnonymousSubjects::Bucket);
    seed_event_at(&db, EventType::Click, Some("u1"), now).await;
    let result = db.aggregate(&clicks).await.expect("aggregate");
    assert_eq!(result.unique_subjects, 1);
}

#[tokio::test]
async fn test_repeated_aggregation_is_stable() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let now = Utc::now();
    for subject in [Some("u1"), Some("u2"), None] {
        seed_event_at(&db, EventType::Click, subject, now).await;
    }

    let query = day_query(EventType::Click);
    let first = db.aggregate(&query).await.expect("first");
    let second = db.aggregate(&query).await.expect("second");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_store_assigns_id_and_created_at() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let before = Utc::now() - Duration::seconds(1);

    let store: &dyn EventStore = &db;
    store
        .insert_event(&NewEvent {
            event_type: EventType::Click,
            subject: Some("u1".to_string()),
            path: Some("/products/abc".to_string()),
            identifier: Some("add_to_cart".to_string()),
        })
        .await
        .expect("insert");

    let after = Utc::now() + Duration::seconds(1);

    let conn = db.conn_for_test().await;
    let (id, event_type, identifier, created_at): (String, String, String, String) = conn
        .prepare(
            "SELECT id, event_type, identifier, CAST(created_at AS VARCHAR) FROM events",
        )
        .expect("prepare")
        .query_row([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .expect("row");

    assert!(uuid::Uuid::parse_str(&id).is_ok());
    assert_eq!(event_type, "click");
    assert_eq!(identifier, "add_to_cart");
    let created_at = NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S%.f")
        .expect("timestamp")
        .and_utc();
    assert!(created_at >= before && created_at <= after);
}

#[tokio::test]
async fn test_batch_insert_is_atomic_and_empty_batch_is_noop() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    db.insert_events(&[]).await.expect("empty batch");

    let batch = vec![
        NewEvent::view(None, "/"),
        NewEvent::view(Some("u1".to_string()), "/products"),
        NewEvent::view(Some("u2".to_string()), "/cart"),
    ];
    db.insert_events(&batch).await.expect("batch");

    let result = db
        .aggregate(&AggregateQuery::new(EventType::View, DateTime::<Utc>::UNIX_EPOCH))
        .await
        .expect("aggregate");
    assert_eq!(result.total, 3);
    assert_eq!(result.unique_subjects, 2);
}

#[tokio::test]
async fn test_schema_rejects_click_without_identifier() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let result = db
        .insert_events(&[NewEvent {
            event_type: EventType::Click,
            subject: None,
            path: None,
            identifier: None,
        }])
        .await;
    assert!(result.is_err());

    let total = db
        .aggregate(&AggregateQuery::new(EventType::Click, DateTime::<Utc>::UNIX_EPOCH))
        .await
        .expect("aggregate")
        .total;
    assert_eq!(total, 0);
}
