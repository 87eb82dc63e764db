//! SurrealDB implementation of [`SearchProjection`].
//!
//! Documents live in a dedicated `search_event` table keyed by event id,
//! carrying a BM25-indexed `search_text` plus the full canonical event
//! document for reconstitution. The table is derived state: dropping it
//! and replaying the ledger rebuilds it exactly.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use vigil_core::repository::{AuditEventPage, SearchProjection};
use vigil_core::{AuditEvent, VigilError, VigilResult};

#[derive(Debug, SurrealValue)]
struct DocumentRow {
    document: serde_json::Value,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB-backed full-text projection of the ledger.
#[derive(Clone)]
pub struct SurrealSearchProjection<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSearchProjection<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

/// Flatten the searchable surface of an event into one analyzed string.
/// Metadata is included verbatim so upstream payload values are findable.
fn search_text(event: &AuditEvent) -> String {
    let mut parts: Vec<String> = vec![
        event.action_type.as_str().to_owned(),
        event.resource_type.as_str().to_owned(),
        event.resource_id.clone(),
        event.service_source.clone(),
        event.result.as_str().to_owned(),
        event.user_id.to_string(),
        event.event_id.to_string(),
    ];
    if let Some(txn) = event.transaction_id {
        parts.push(txn.to_string());
    }
    if let Some(reason) = &event.failure_reason {
        parts.push(reason.clone());
    }
    parts.extend(event.compliance_flags.iter().cloned());
    if !event.metadata.is_null() {
        parts.push(event.metadata.to_string());
    }
    parts.join(" ")
}

impl<C: Connection> SearchProjection for SurrealSearchProjection<C> {
    async fn index(&self, event: &AuditEvent) -> VigilResult<()> {
        let document = serde_json::to_value(event)
            .map_err(|e| VigilError::Projection(format!("failed to serialize event: {e}")))?;

        self.db
            .query(
                "UPSERT type::record('search_event', $id) SET \
                 event_id = $event_id, \
                 timestamp = $timestamp, \
                 search_text = $search_text, \
                 document = $document",
            )
            .bind(("id", event.event_id.to_string()))
            .bind(("event_id", event.event_id.to_string()))
            .bind(("timestamp", event.timestamp))
            .bind(("search_text", search_text(event)))
            .bind(("document", document))
            .await
            .map_err(|e| VigilError::Projection(e.to_string()))?
            .check()
            .map_err(|e| VigilError::Projection(e.to_string()))?;

        Ok(())
    }

    async fn search(&self, query: &str, from: u64, size: u64) -> VigilResult<AuditEventPage> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM search_event \
                 WHERE search_text @@ $query GROUP ALL",
            )
            .query(
                "SELECT document, timestamp FROM search_event \
                 WHERE search_text @@ $query \
                 ORDER BY timestamp DESC \
                 LIMIT $size START $from",
            )
            .bind(("query", query.to_owned()))
            .bind(("size", size))
            .bind(("from", from))
            .await
            .map_err(|e| VigilError::Projection(e.to_string()))?
            .check()
            .map_err(|e| VigilError::Projection(e.to_string()))?;

        let count_rows: Vec<CountRow> = result
            .take(0)
            .map_err(|e| VigilError::Projection(e.to_string()))?;
        let total_count = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<DocumentRow> = result
            .take(1)
            .map_err(|e| VigilError::Projection(e.to_string()))?;

        let events = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value::<AuditEvent>(row.document)
                    .map_err(|e| VigilError::Projection(format!("malformed document: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let has_more = total_count > from + events.len() as u64;

        Ok(AuditEventPage {
            events,
            total_count,
            page_size: size,
            has_more,
        })
    }
}
