//! Integration tests for the full-text search projection using in-memory
//! SurrealDB.

use chrono::{TimeZone, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;
use vigil_core::repository::SearchProjection;
use vigil_core::{ActionType, AuditEvent, ResourceType};
use vigil_db::SurrealSearchProjection;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    db
}

fn sample_event(resource_id: &str) -> AuditEvent {
    let mut event = AuditEvent::new(
        Uuid::new_v4(),
        ActionType::Transfer,
        ResourceType::Transaction,
        resource_id,
    );
    event.service_source = "banking.transactions".into();
    event.request_id = Uuid::new_v4().to_string();
    event.digital_signature = "feedface".into();
    event.encryption_key_id = 1;
    event
}

#[tokio::test]
async fn indexed_events_are_searchable_by_resource_id() {
    let db = setup().await;
    let projection = SurrealSearchProjection::new(db);

    let event = sample_event("wire-8891");
    projection.index(&event).await.unwrap();

    let page = projection.search("wire-8891", 0, 20).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.events[0].event_id, event.event_id);
    assert_eq!(page.events[0].action_type, ActionType::Transfer);
    assert_eq!(page.events[0].service_source, "banking.transactions");
}

#[tokio::test]
async fn metadata_payload_values_are_searchable() {
    let db = setup().await;
    let projection = SurrealSearchProjection::new(db);

    let mut event = sample_event("acct-1");
    event.metadata = serde_json::json!({"counterparty": "acme-imports"});
    projection.index(&event).await.unwrap();

    let page = projection.search("acme-imports", 0, 20).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.events[0].event_id, event.event_id);
}

#[tokio::test]
async fn reindexing_the_same_event_is_idempotent() {
    let db = setup().await;
    let projection = SurrealSearchProjection::new(db);

    let event = sample_event("acct-2");
    projection.index(&event).await.unwrap();
    projection.index(&event).await.unwrap();

    let page = projection.search("acct-2", 0, 20).await.unwrap();
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn results_sort_by_time_descending_and_paginate() {
    let db = setup().await;
    let projection = SurrealSearchProjection::new(db);

    let base = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    for i in 0..5 {
        let mut event = sample_event("shared-resource");
        event.timestamp = base + chrono::Duration::minutes(i);
        projection.index(&event).await.unwrap();
    }

    let first = projection.search("shared-resource", 0, 2).await.unwrap();
    assert_eq!(first.total_count, 5);
    assert_eq!(first.events.len(), 2);
    assert!(first.has_more);
    assert!(first.events[0].timestamp >= first.events[1].timestamp);
    assert_eq!(first.events[0].timestamp, base + chrono::Duration::minutes(4));

    let last = projection.search("shared-resource", 4, 2).await.unwrap();
    assert_eq!(last.events.len(), 1);
    assert!(!last.has_more);
    assert_eq!(last.events[0].timestamp, base);
}

#[tokio::test]
async fn unmatched_query_returns_empty_page() {
    let db = setup().await;
    let projection = SurrealSearchProjection::new(db);

    projection.index(&sample_event("acct-3")).await.unwrap();

    let page = projection.search("nonexistent-token", 0, 20).await.unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.events.is_empty());
    assert!(!page.has_more);
}
