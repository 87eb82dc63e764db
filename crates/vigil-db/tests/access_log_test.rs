//! Integration tests for the access-log store using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use vigil_core::repository::AccessLogStore;
use vigil_core::{AccessType, AuditAccessLog};
use vigil_db::SurrealAccessLogStore;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    db
}

#[derive(Debug, SurrealValue)]
struct AccessRow {
    accessor_role: String,
    access_type: String,
    records_viewed: u64,
}

#[tokio::test]
async fn records_are_appended_with_accessor_context() {
    let db = setup().await;
    let store = SurrealAccessLogStore::new(db.clone());

    let mut entry = AuditAccessLog::new(
        Uuid::new_v4(),
        "compliance-officer",
        AccessType::Search,
        "user_id=... action_types=[TRANSFER]",
        42,
    );
    entry.ip_address = "10.0.0.9".into();
    entry.purpose = "SAR investigation".into();

    store.record(&entry).await.unwrap();

    let mut result = db
        .query("SELECT accessor_role, access_type, records_viewed FROM access_log")
        .await
        .unwrap();
    let rows: Vec<AccessRow> = result.take(0).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].accessor_role, "compliance-officer");
    assert_eq!(rows[0].access_type, "SEARCH");
    assert_eq!(rows[0].records_viewed, 42);
}

#[tokio::test]
async fn each_read_gets_its_own_row() {
    let db = setup().await;
    let store = SurrealAccessLogStore::new(db.clone());

    for i in 0..3 {
        let entry = AuditAccessLog::new(
            Uuid::new_v4(),
            "auditor",
            AccessType::View,
            format!("page={i}"),
            10,
        );
        store.record(&entry).await.unwrap();
    }

    let mut result = db
        .query("SELECT accessor_role, access_type, records_viewed FROM access_log")
        .await
        .unwrap();
    let rows: Vec<AccessRow> = result.take(0).unwrap();
    assert_eq!(rows.len(), 3);
}
