//! VIGIL Service — the audit pipeline core.
//!
//! [`AuditService`] owns the write path (enrich, sign, commit, fan out)
//! and the read path (query, verify every record, page or abort). It is
//! generic over the store contracts in `vigil-core`, so tests and
//! deployments choose backends freely.

mod service;

pub use service::{AccessContext, AuditService};
