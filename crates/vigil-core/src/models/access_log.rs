//! Access-log domain model — the audit of audits.
//!
//! A parallel append-only record of who read the ledger. Not
//! signature-chained; same immutability discipline at the storage layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    View,
    Export,
    Search,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::Export => "EXPORT",
            Self::Search => "SEARCH",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One read of the audit ledger, recorded by the read service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditAccessLog {
    pub access_id: Uuid,
    pub accessor_id: Uuid,
    pub accessor_role: String,
    pub access_type: AccessType,
    /// Rendered filter or query text the accessor submitted.
    pub query_filter: String,
    pub records_viewed: u64,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
    /// Stated business purpose for the access.
    pub purpose: String,
}

impl AuditAccessLog {
    pub fn new(
        accessor_id: Uuid,
        accessor_role: impl Into<String>,
        access_type: AccessType,
        query_filter: impl Into<String>,
        records_viewed: u64,
    ) -> Self {
        Self {
            access_id: Uuid::new_v4(),
            accessor_id,
            accessor_role: accessor_role.into(),
            access_type,
            query_filter: query_filter.into(),
            records_viewed,
            ip_address: String::new(),
            timestamp: Utc::now(),
            purpose: String::new(),
        }
    }
}
