//! Store contracts for data access abstraction.
//!
//! All store operations are async. Each store is a capability exposing
//! exactly the operation set the ledger architecture allows — in
//! particular, [`LedgerStore`] has no update or delete operation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::VigilResult;
use crate::models::access_log::AuditAccessLog;
use crate::models::event::{ActionType, AuditEvent, AuditResult, ResourceType};

/// Query predicates for audit events. Every field is conjunctive; empty
/// vectors and `None` mean "no constraint".
#[derive(Debug, Clone)]
pub struct AuditEventFilter {
    pub event_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub action_types: Vec<ActionType>,
    pub resource_types: Vec<ResourceType>,
    pub resource_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub result: Option<AuditResult>,
    pub service_source: Option<String>,
    pub ip_address: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for AuditEventFilter {
    fn default() -> Self {
        Self {
            event_id: None,
            user_id: None,
            transaction_id: None,
            action_types: Vec::new(),
            resource_types: Vec::new(),
            resource_id: None,
            start_time: None,
            end_time: None,
            result: None,
            service_source: None,
            ip_address: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// A page of audit events plus the unpaginated total for the same filter.
#[derive(Debug, Clone, Default)]
pub struct AuditEventPage {
    pub events: Vec<AuditEvent>,
    pub total_count: u64,
    pub page_size: u64,
    pub has_more: bool,
}

/// Append-only durable store of audit events — the authoritative ledger.
///
/// The contract exposes no update or delete. At the storage backend the
/// application principal must additionally lack UPDATE/DELETE rights on
/// the events table; implementations warn when they can detect broader
/// privileges at connect time.
pub trait LedgerStore: Send + Sync {
    /// Append one event. Synchronous with respect to durability; never
    /// retried internally. Fails if the record lacks `digital_signature`,
    /// `event_id`, or `user_id`, or if storage rejects the write. A
    /// duplicate `event_id` surfaces as `AlreadyExists`.
    fn append(&self, event: &AuditEvent) -> impl Future<Output = VigilResult<()>> + Send;

    /// Filtered, paginated query ordered `timestamp DESC, event_id DESC`.
    /// `total_count` covers the filter without pagination.
    fn query(
        &self,
        filter: &AuditEventFilter,
    ) -> impl Future<Output = VigilResult<AuditEventPage>> + Send;

    /// Signature of the most recently timestamped record, or the empty
    /// string for an empty ledger (the genesis case).
    fn tail_signature(&self) -> impl Future<Output = VigilResult<String>> + Send;
}

/// Secondary full-text index. Best-effort, rebuildable, never
/// authoritative.
pub trait SearchProjection: Send + Sync {
    /// Index one event. Idempotent per `event_id` so the projection can be
    /// rebuilt by replaying the ledger.
    fn index(&self, event: &AuditEvent) -> impl Future<Output = VigilResult<()>> + Send;

    /// Full-text query sorted `timestamp DESC`. Results are advisory
    /// pointers; canonical reads go through the ledger.
    fn search(
        &self,
        query: &str,
        from: u64,
        size: u64,
    ) -> impl Future<Output = VigilResult<AuditEventPage>> + Send;
}

/// Cold-storage writer for event batches and generated reports.
pub trait ArchiveSink: Send + Sync {
    /// Write a time-partitioned batch object under
    /// `YYYY/MM/DD/{batch_id}.json`. Empty batches are a no-op; keys are
    /// write-once and a repeated key is refused.
    fn archive_batch(
        &self,
        events: &[AuditEvent],
        batch_id: &str,
    ) -> impl Future<Output = VigilResult<()>> + Send;

    /// Write a report under `reports/YYYY/MM/{name}`.
    fn store_report(
        &self,
        name: &str,
        data: &[u8],
    ) -> impl Future<Output = VigilResult<()>> + Send;
}

/// Append-only record of ledger reads.
pub trait AccessLogStore: Send + Sync {
    fn record(&self, entry: &AuditAccessLog) -> impl Future<Output = VigilResult<()>> + Send;
}
