//! Integration tests for the append-only ledger store using in-memory
//! SurrealDB.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;
use vigil_core::repository::{AuditEventFilter, LedgerStore};
use vigil_core::{ActionType, AuditEvent, AuditResult, ResourceType, VigilError};
use vigil_crypto::{EncryptionConfig, FieldCipher};
use vigil_db::SurrealLedgerStore;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    db
}

fn cipher() -> FieldCipher {
    FieldCipher::new(&EncryptionConfig {
        keys_base64: vec![STANDARD.encode([7u8; 32])],
        current_key_version: 1,
        hmac_secret_base64: STANDARD.encode(b"ledger-test-secret"),
    })
    .unwrap()
}

/// A fully populated, signed event ready for `append`.
fn signed_event(cipher: &FieldCipher, user_id: Uuid) -> AuditEvent {
    let mut event = AuditEvent::new(
        user_id,
        ActionType::Login,
        ResourceType::User,
        user_id.to_string(),
    );
    event.service_source = "banking.audit.events".into();
    event.request_id = Uuid::new_v4().to_string();
    event.digital_signature = cipher.sign(&event);
    event.encryption_key_id = cipher.current_version();
    event
}

#[tokio::test]
async fn append_and_query_roundtrip() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();

    let user_id = Uuid::new_v4();
    let mut event = signed_event(&cipher, user_id);
    event.transaction_id = Some(Uuid::new_v4());
    event.ip_address = Some("10.1.2.3".into());
    event.metadata = serde_json::json!({"channel": "mobile", "amount_cents": 125_000});
    event.compliance_flags = vec!["AML".into(), "CTR".into()];
    event.data_before = Some(vec![1, 2, 3]);
    // Re-sign: the binding excludes these fields but the record is
    // committed exactly as signed.
    event.digital_signature = cipher.sign(&event);

    store.append(&event).await.unwrap();

    let page = store
        .query(&AuditEventFilter {
            user_id: Some(user_id),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total_count, 1);
    assert!(!page.has_more);
    let stored = &page.events[0];
    assert_eq!(stored.event_id, event.event_id);
    assert_eq!(stored.transaction_id, event.transaction_id);
    assert_eq!(stored.action_type, ActionType::Login);
    assert_eq!(stored.result, AuditResult::Pending);
    assert_eq!(stored.service_source, "banking.audit.events");
    assert_eq!(stored.ip_address.as_deref(), Some("10.1.2.3"));
    assert_eq!(stored.metadata["channel"], "mobile");
    assert_eq!(stored.compliance_flags, vec!["AML", "CTR"]);
    assert_eq!(stored.data_before.as_deref(), Some(&[1u8, 2, 3][..]));
    assert_eq!(stored.digital_signature, event.digital_signature);
    assert!(cipher.verify(stored));
}

#[tokio::test]
async fn duplicate_event_id_is_rejected_and_never_duplicates() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();

    let event = signed_event(&cipher, Uuid::new_v4());
    store.append(&event).await.unwrap();

    let err = store.append(&event).await.unwrap_err();
    assert!(matches!(err, VigilError::AlreadyExists { .. }));
    assert_eq!(err.code(), "ALREADY_EXISTS");

    let page = store
        .query(&AuditEventFilter {
            event_id: Some(event.event_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn append_requires_signature_and_ids() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();

    let mut unsigned = signed_event(&cipher, Uuid::new_v4());
    unsigned.digital_signature = String::new();
    assert!(matches!(
        store.append(&unsigned).await.unwrap_err(),
        VigilError::Validation { .. }
    ));

    let mut no_user = signed_event(&cipher, Uuid::new_v4());
    no_user.user_id = Uuid::nil();
    assert!(matches!(
        store.append(&no_user).await.unwrap_err(),
        VigilError::Validation { .. }
    ));

    let mut no_id = signed_event(&cipher, Uuid::new_v4());
    no_id.event_id = Uuid::nil();
    assert!(matches!(
        store.append(&no_id).await.unwrap_err(),
        VigilError::Validation { .. }
    ));
}

#[tokio::test]
async fn query_orders_by_time_desc_with_event_id_tiebreak() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();
    let user_id = Uuid::new_v4();

    let shared_ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let older_ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    for ts in [shared_ts, shared_ts, older_ts] {
        let mut event = signed_event(&cipher, user_id);
        event.timestamp = ts;
        event.digital_signature = cipher.sign(&event);
        store.append(&event).await.unwrap();
    }

    let page = store
        .query(&AuditEventFilter {
            user_id: Some(user_id),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.events.len(), 3);
    assert_eq!(page.events[0].timestamp, shared_ts);
    assert_eq!(page.events[1].timestamp, shared_ts);
    assert_eq!(page.events[2].timestamp, older_ts);
    // Tie broken by event_id descending for reproducible pagination.
    assert!(
        page.events[0].event_id.to_string() > page.events[1].event_id.to_string()
    );
}

#[tokio::test]
async fn pagination_returns_each_event_exactly_once() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();
    let user_id = Uuid::new_v4();

    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut appended = Vec::new();
    for i in 0..25 {
        let mut event = signed_event(&cipher, user_id);
        event.timestamp = base + chrono::Duration::seconds(i);
        event.digital_signature = cipher.sign(&event);
        store.append(&event).await.unwrap();
        appended.push(event.event_id);
    }

    let mut seen = Vec::new();
    let mut last_ts = None;
    for offset in [0u64, 10, 20] {
        let page = store
            .query(&AuditEventFilter {
                user_id: Some(user_id),
                limit: 10,
                offset,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, 25);
        assert_eq!(page.has_more, offset + page.events.len() as u64 != 25);

        for event in &page.events {
            if let Some(prev) = last_ts {
                assert!(event.timestamp <= prev, "timestamps must be non-increasing");
            }
            last_ts = Some(event.timestamp);
            seen.push(event.event_id);
        }
    }

    seen.sort();
    appended.sort();
    assert_eq!(seen, appended, "each event appears exactly once");
}

#[tokio::test]
async fn limit_zero_returns_count_without_rows() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();
    let user_id = Uuid::new_v4();

    for _ in 0..3 {
        store.append(&signed_event(&cipher, user_id)).await.unwrap();
    }

    let page = store
        .query(&AuditEventFilter {
            user_id: Some(user_id),
            limit: 0,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(page.events.is_empty());
    assert_eq!(page.total_count, 3);
    assert!(page.has_more);
}

#[tokio::test]
async fn filters_constrain_by_time_window_action_and_result() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();
    let user_id = Uuid::new_v4();

    let morning = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let evening = Utc.with_ymd_and_hms(2024, 6, 1, 21, 0, 0).unwrap();

    let mut login = signed_event(&cipher, user_id);
    login.timestamp = morning;
    login.digital_signature = cipher.sign(&login);
    store.append(&login).await.unwrap();

    let mut transfer = signed_event(&cipher, user_id);
    transfer.action_type = ActionType::Transfer;
    transfer.resource_type = ResourceType::Transaction;
    transfer.timestamp = evening;
    transfer.result = AuditResult::Success;
    transfer.digital_signature = cipher.sign(&transfer);
    store.append(&transfer).await.unwrap();

    let afternoon_on = store
        .query(&AuditEventFilter {
            user_id: Some(user_id),
            start_time: Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(afternoon_on.total_count, 1);
    assert_eq!(afternoon_on.events[0].event_id, transfer.event_id);

    let transfers = store
        .query(&AuditEventFilter {
            user_id: Some(user_id),
            action_types: vec![ActionType::Transfer, ActionType::Approve],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(transfers.total_count, 1);

    let successes = store
        .query(&AuditEventFilter {
            user_id: Some(user_id),
            result: Some(AuditResult::Success),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(successes.total_count, 1);
    assert_eq!(successes.events[0].event_id, transfer.event_id);
}

#[tokio::test]
async fn tail_signature_is_empty_for_genesis_then_tracks_latest() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();

    assert_eq!(store.tail_signature().await.unwrap(), "");

    let earlier = {
        let mut e = signed_event(&cipher, Uuid::new_v4());
        e.timestamp = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        e.digital_signature = cipher.sign(&e);
        e
    };
    let later = {
        let mut e = signed_event(&cipher, Uuid::new_v4());
        e.timestamp = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();
        e.digital_signature = cipher.sign(&e);
        e
    };

    store.append(&later).await.unwrap();
    store.append(&earlier).await.unwrap();

    assert_eq!(
        store.tail_signature().await.unwrap(),
        later.digital_signature
    );
}

#[tokio::test]
async fn unregistered_action_types_roundtrip_verbatim() {
    let db = setup().await;
    let store = SurrealLedgerStore::new(db);
    let cipher = cipher();
    let user_id = Uuid::new_v4();

    let mut event = signed_event(&cipher, user_id);
    event.action_type = ActionType::from("WIRE_RECALL");
    event.digital_signature = cipher.sign(&event);
    store.append(&event).await.unwrap();

    let page = store
        .query(&AuditEventFilter {
            user_id: Some(user_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.events[0].action_type.as_str(), "WIRE_RECALL");
    assert!(cipher.verify(&page.events[0]));
}
