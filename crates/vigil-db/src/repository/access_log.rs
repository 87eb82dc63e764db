//! SurrealDB implementation of [`AccessLogStore`].

use surrealdb::{Connection, Surreal};
use vigil_core::repository::AccessLogStore;
use vigil_core::{AuditAccessLog, VigilResult};

use crate::error::DbError;

/// Append-only store for the audit-of-audits log.
#[derive(Clone)]
pub struct SurrealAccessLogStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccessLogStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AccessLogStore for SurrealAccessLogStore<C> {
    async fn record(&self, entry: &AuditAccessLog) -> VigilResult<()> {
        self.db
            .query(
                "CREATE type::record('access_log', $id) SET \
                 access_id = $access_id, \
                 accessor_id = $accessor_id, \
                 accessor_role = $accessor_role, \
                 access_type = $access_type, \
                 query_filter = $query_filter, \
                 records_viewed = $records_viewed, \
                 ip_address = $ip_address, \
                 timestamp = $timestamp, \
                 purpose = $purpose",
            )
            .bind(("id", entry.access_id.to_string()))
            .bind(("access_id", entry.access_id.to_string()))
            .bind(("accessor_id", entry.accessor_id.to_string()))
            .bind(("accessor_role", entry.accessor_role.clone()))
            .bind(("access_type", entry.access_type.as_str().to_owned()))
            .bind(("query_filter", entry.query_filter.clone()))
            .bind(("records_viewed", entry.records_viewed))
            .bind(("ip_address", entry.ip_address.clone()))
            .bind(("timestamp", entry.timestamp))
            .bind(("purpose", entry.purpose.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
