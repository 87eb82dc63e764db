//! The audit service: ingestion processing and verified reads.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{sleep, timeout};
use tracing::{error, warn};
use uuid::Uuid;
use vigil_core::repository::{
    AccessLogStore, ArchiveSink, AuditEventFilter, AuditEventPage, LedgerStore, SearchProjection,
};
use vigil_core::{AccessType, AuditAccessLog, AuditEvent, VigilError, VigilResult};
use vigil_crypto::FieldCipher;

/// Deadline for one detached indexing dispatch, retries included.
const INDEX_DEADLINE: Duration = Duration::from_secs(5);
/// Attempts per indexing dispatch; backoff is linear in the attempt.
const INDEX_ATTEMPTS: u32 = 3;
const INDEX_BACKOFF_STEP: Duration = Duration::from_millis(250);

/// Page size used when replaying the ledger into the projection.
const REINDEX_PAGE: u64 = 500;

/// Accessor identity for the audit-of-audits log, supplied by the API
/// layer.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub accessor_id: Uuid,
    pub accessor_role: String,
    pub access_type: AccessType,
    pub ip_address: String,
    pub purpose: String,
}

/// Orchestrates the audit pipeline across the ledger, the search
/// projection, the access log, and the cryptographic primitives.
pub struct AuditService<L, S, A> {
    ledger: L,
    projection: S,
    access_log: A,
    cipher: Arc<FieldCipher>,
    /// SOC alerting seam: fired with the offending event id on any
    /// read-path signature mismatch, before the error propagates.
    integrity_hook: Option<Arc<dyn Fn(Uuid) + Send + Sync>>,
}

impl<L, S, A> AuditService<L, S, A>
where
    L: LedgerStore,
    S: SearchProjection + Clone + Send + Sync + 'static,
    A: AccessLogStore,
{
    pub fn new(ledger: L, projection: S, access_log: A, cipher: Arc<FieldCipher>) -> Self {
        Self {
            ledger,
            projection,
            access_log,
            cipher,
            integrity_hook: None,
        }
    }

    /// Install a hook fired on every read-path integrity failure.
    pub fn with_integrity_hook(mut self, hook: Arc<dyn Fn(Uuid) + Send + Sync>) -> Self {
        self.integrity_hook = Some(hook);
        self
    }

    /// Main ingestion entry point: enrich, sign, commit, fan out.
    ///
    /// The ledger append is synchronous and mandatory; its errors
    /// propagate unchanged and are never retried here — the consumer
    /// layer owns retry policy. Search indexing is dispatched to a
    /// detached task after the commit and can never fail this call.
    ///
    /// Returns the committed event, the last moment it is legitimately
    /// mutable.
    pub async fn process_and_store(&self, mut event: AuditEvent) -> VigilResult<AuditEvent> {
        // Ensure ids and timestamps. The Unix epoch stands in for
        // "unset" on the non-optional timestamp fields.
        if event.event_id.is_nil() {
            event.event_id = Uuid::new_v4();
        }
        if event.created_at == DateTime::<Utc>::UNIX_EPOCH {
            event.created_at = Utc::now();
        }
        if event.timestamp == DateTime::<Utc>::UNIX_EPOCH {
            event.timestamp = event.created_at;
        }
        if event.request_id.is_empty() {
            event.request_id = Uuid::new_v4().to_string();
        }

        // Sign the canonical binding and stamp the key version.
        event.digital_signature = self.cipher.sign(&event);
        event.encryption_key_id = self.cipher.current_version();

        // Immutable ledger commit. Must succeed before anything else
        // sees the event.
        self.ledger.append(&event).await?;

        self.dispatch_index(event.clone());

        Ok(event)
    }

    /// Detached, deadline-bounded search indexing.
    ///
    /// The worker task retries with linear backoff inside the deadline;
    /// the supervisor task logs panics and discards them. Neither can
    /// affect the primary path, and a terminal failure only costs search
    /// coverage until the next projection rebuild.
    fn dispatch_index(&self, event: AuditEvent) {
        let projection = self.projection.clone();
        let event_id = event.event_id;

        let worker = tokio::spawn(async move {
            let attempts = async {
                let mut last_err = None;
                for attempt in 1..=INDEX_ATTEMPTS {
                    match projection.index(&event).await {
                        Ok(()) => return Ok(()),
                        Err(e) => {
                            last_err = Some(e);
                            if attempt < INDEX_ATTEMPTS {
                                sleep(INDEX_BACKOFF_STEP * attempt).await;
                            }
                        }
                    }
                }
                Err(last_err.expect("at least one attempt ran"))
            };

            match timeout(INDEX_DEADLINE, attempts).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    event_id = %event.event_id,
                    error = %e,
                    "search indexing failed; projection diverges until rebuild"
                ),
                Err(_) => warn!(
                    event_id = %event.event_id,
                    "search indexing deadline exceeded; projection diverges until rebuild"
                ),
            }
        });

        tokio::spawn(async move {
            if let Err(join_err) = worker.await {
                if join_err.is_panic() {
                    error!(event_id = %event_id, "panic in detached search indexing task");
                }
            }
        });
    }

    /// Retrieve an audit trail with read-time integrity verification.
    ///
    /// Every returned record's signature is recomputed; the first
    /// mismatch aborts the whole page with an integrity error naming the
    /// offending event. Partial pages are never served.
    pub async fn get_trail(&self, filter: &AuditEventFilter) -> VigilResult<AuditEventPage> {
        let page = self.ledger.query(filter).await?;

        for event in &page.events {
            if !self.cipher.verify(event) {
                error!(
                    event_id = %event.event_id,
                    "cryptographic validation failure: signature mismatch, \
                     potential tampering detected"
                );
                if let Some(hook) = &self.integrity_hook {
                    hook(event.event_id);
                }
                return Err(VigilError::Integrity {
                    event_id: event.event_id,
                });
            }
        }

        Ok(page)
    }

    /// Full-text search via the projection. Results are advisory; no
    /// signature verification happens here.
    pub async fn search(&self, query: &str, from: u64, size: u64) -> VigilResult<AuditEventPage> {
        self.projection.search(query, from, size).await
    }

    /// Manual integrity check for a single event.
    ///
    /// True iff the event exists (the trail read already verified it);
    /// false when absent; an integrity failure propagates as an error.
    pub async fn verify_event(&self, event_id: &str) -> VigilResult<bool> {
        let id = Uuid::parse_str(event_id).map_err(|e| VigilError::Validation {
            message: format!("invalid event id: {e}"),
        })?;

        let filter = AuditEventFilter {
            event_id: Some(id),
            limit: 1,
            ..Default::default()
        };
        let page = self.get_trail(&filter).await?;
        Ok(!page.events.is_empty())
    }

    /// Record who read the ledger, for the audit-of-audits log.
    pub async fn record_access(
        &self,
        ctx: &AccessContext,
        query_filter: &str,
        records_viewed: u64,
    ) -> VigilResult<()> {
        let mut entry = AuditAccessLog::new(
            ctx.accessor_id,
            ctx.accessor_role.clone(),
            ctx.access_type,
            query_filter,
            records_viewed,
        );
        entry.ip_address = ctx.ip_address.clone();
        entry.purpose = ctx.purpose.clone();
        self.access_log.record(&entry).await
    }

    /// Rebuild the search projection by replaying the ledger.
    ///
    /// The projection is derived state; replaying upserts every event so
    /// a stale or empty index converges on full coverage. Returns the
    /// number of events indexed.
    pub async fn reindex(&self) -> VigilResult<u64> {
        let mut offset = 0;
        let mut indexed = 0u64;

        loop {
            let filter = AuditEventFilter {
                limit: REINDEX_PAGE,
                offset,
                ..Default::default()
            };
            let page = self.ledger.query(&filter).await?;
            if page.events.is_empty() {
                break;
            }

            for event in &page.events {
                self.projection.index(event).await?;
                indexed += 1;
            }

            if !page.has_more {
                break;
            }
            offset += REINDEX_PAGE;
        }

        Ok(indexed)
    }

    /// Export a verified time window of events to an archive sink as one
    /// batch object. Intended for the external archival worker and for
    /// regulator export.
    pub async fn export_window(
        &self,
        sink: &impl ArchiveSink,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        batch_id: &str,
    ) -> VigilResult<u64> {
        let mut offset = 0;
        let mut events = Vec::new();

        loop {
            let filter = AuditEventFilter {
                start_time: Some(start),
                end_time: Some(end),
                limit: REINDEX_PAGE,
                offset,
                ..Default::default()
            };
            // Verified read: tampered records must never reach an
            // archive object.
            let page = self.get_trail(&filter).await?;
            let done = !page.has_more;
            events.extend(page.events);
            if done {
                break;
            }
            offset += REINDEX_PAGE;
        }

        let count = events.len() as u64;
        sink.archive_batch(&events, batch_id).await?;
        Ok(count)
    }
}
