//! VIGIL Core — Domain models, store contracts, and error types for the
//! tamper-evident audit ledger.
//!
//! This crate is pure: no I/O, no async runtime coupling beyond the
//! `impl Future` store contracts. Backends live in `vigil-db` and
//! `vigil-archive`; orchestration lives in `vigil-service`.

pub mod error;
pub mod mask;
pub mod models;
pub mod repository;

pub use error::{VigilError, VigilResult};
pub use models::access_log::{AccessType, AuditAccessLog};
pub use models::event::{
    ActionType, AuditEvent, AuditResult, ResourceType, RetentionCategory,
};
pub use models::retention::{DeleteAction, RetentionPolicy};
pub use repository::{
    AccessLogStore, ArchiveSink, AuditEventFilter, AuditEventPage, LedgerStore, SearchProjection,
};
