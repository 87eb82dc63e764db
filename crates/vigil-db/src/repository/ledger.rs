//! SurrealDB implementation of [`LedgerStore`].
//!
//! Append-only by construction: this type exposes no update or delete,
//! the schema denies both at the permission layer, and the record id is
//! the event id so a redelivered event collides instead of duplicating.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::{Bytes, SurrealValue};
use uuid::Uuid;
use vigil_core::repository::{AuditEventFilter, AuditEventPage, LedgerStore};
use vigil_core::{ActionType, AuditEvent, AuditResult, ResourceType, RetentionCategory, VigilError, VigilResult};

use crate::error::DbError;

const TABLE: &str = "audit_event";

#[derive(Debug, SurrealValue)]
struct AuditEventRow {
    event_id: String,
    transaction_id: Option<String>,
    user_id: String,
    actor_id: Option<String>,
    action_type: String,
    resource_type: String,
    resource_id: String,
    service_source: String,
    timestamp: DateTime<Utc>,
    result: String,
    failure_reason: Option<String>,
    ip_address: Option<String>,
    geolocation: Option<String>,
    user_agent: Option<String>,
    request_id: String,
    session_id: Option<String>,
    digital_signature: String,
    metadata: serde_json::Value,
    data_before: Option<Bytes>,
    data_after: Option<Bytes>,
    compliance_flags: Vec<String>,
    retention_category: String,
    encryption_key_id: u32,
    created_at: DateTime<Utc>,
}

impl AuditEventRow {
    fn try_into_event(self) -> Result<AuditEvent, DbError> {
        let parse_uuid = |label: &str, s: &str| {
            Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {label} UUID: {e}")))
        };

        Ok(AuditEvent {
            event_id: parse_uuid("event", &self.event_id)?,
            transaction_id: self
                .transaction_id
                .as_deref()
                .map(|s| parse_uuid("transaction", s))
                .transpose()?,
            user_id: parse_uuid("user", &self.user_id)?,
            actor_id: self
                .actor_id
                .as_deref()
                .map(|s| parse_uuid("actor", s))
                .transpose()?,
            action_type: ActionType::from(self.action_type.as_str()),
            resource_type: ResourceType::from(self.resource_type.as_str()),
            resource_id: self.resource_id,
            service_source: self.service_source,
            timestamp: self.timestamp,
            result: AuditResult::parse(&self.result)
                .ok_or_else(|| DbError::Decode(format!("unknown result: {}", self.result)))?,
            failure_reason: self.failure_reason,
            ip_address: self.ip_address,
            geolocation: self.geolocation,
            user_agent: self.user_agent,
            request_id: self.request_id,
            session_id: self.session_id,
            digital_signature: self.digital_signature,
            metadata: self.metadata,
            data_before: self.data_before.map(|b| b.into_inner().to_vec()),
            data_after: self.data_after.map(|b| b.into_inner().to_vec()),
            compliance_flags: self.compliance_flags,
            retention_category: RetentionCategory::parse(&self.retention_category).ok_or_else(
                || DbError::Decode(format!("unknown retention category: {}", self.retention_category)),
            )?,
            encryption_key_id: self.encryption_key_id,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct SignatureRow {
    digital_signature: String,
}

/// SurrealDB implementation of the append-only ledger.
#[derive(Clone)]
pub struct SurrealLedgerStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLedgerStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

/// Conjunctive WHERE clause for the filter. Conditions reference fixed
/// bind names; [`bind_filter`] supplies matching values.
fn filter_conditions(filter: &AuditEventFilter) -> Vec<&'static str> {
    let mut conditions = Vec::new();
    if filter.event_id.is_some() {
        conditions.push("event_id = $event_id");
    }
    if filter.user_id.is_some() {
        conditions.push("user_id = $user_id");
    }
    if filter.transaction_id.is_some() {
        conditions.push("transaction_id = $transaction_id");
    }
    if filter.resource_id.is_some() {
        conditions.push("resource_id = $resource_id");
    }
    if !filter.action_types.is_empty() {
        conditions.push("action_type IN $action_types");
    }
    if !filter.resource_types.is_empty() {
        conditions.push("resource_type IN $resource_types");
    }
    if filter.start_time.is_some() {
        conditions.push("timestamp >= $start_time");
    }
    if filter.end_time.is_some() {
        conditions.push("timestamp <= $end_time");
    }
    if filter.result.is_some() {
        conditions.push("result = $result");
    }
    if filter.service_source.is_some() {
        conditions.push("service_source = $service_source");
    }
    if filter.ip_address.is_some() {
        conditions.push("ip_address = $ip_address");
    }
    conditions
}

fn where_clause(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn bind_filter<'r, C: Connection>(
    mut query: surrealdb::method::Query<'r, C>,
    filter: &AuditEventFilter,
) -> surrealdb::method::Query<'r, C> {
    if let Some(id) = filter.event_id {
        query = query.bind(("event_id", id.to_string()));
    }
    if let Some(id) = filter.user_id {
        query = query.bind(("user_id", id.to_string()));
    }
    if let Some(id) = filter.transaction_id {
        query = query.bind(("transaction_id", id.to_string()));
    }
    if let Some(resource_id) = &filter.resource_id {
        query = query.bind(("resource_id", resource_id.clone()));
    }
    if !filter.action_types.is_empty() {
        let values: Vec<String> = filter
            .action_types
            .iter()
            .map(|a| a.as_str().to_owned())
            .collect();
        query = query.bind(("action_types", values));
    }
    if !filter.resource_types.is_empty() {
        let values: Vec<String> = filter
            .resource_types
            .iter()
            .map(|r| r.as_str().to_owned())
            .collect();
        query = query.bind(("resource_types", values));
    }
    if let Some(start) = filter.start_time {
        query = query.bind(("start_time", start));
    }
    if let Some(end) = filter.end_time {
        query = query.bind(("end_time", end));
    }
    if let Some(result) = filter.result {
        query = query.bind(("result", result.as_str().to_owned()));
    }
    if let Some(source) = &filter.service_source {
        query = query.bind(("service_source", source.clone()));
    }
    if let Some(ip) = &filter.ip_address {
        query = query.bind(("ip_address", ip.clone()));
    }
    query
}

impl<C: Connection> LedgerStore for SurrealLedgerStore<C> {
    async fn append(&self, event: &AuditEvent) -> VigilResult<()> {
        if event.event_id.is_nil() {
            return Err(VigilError::Validation {
                message: "audit event is missing event_id".into(),
            });
        }
        if event.user_id.is_nil() {
            return Err(VigilError::Validation {
                message: "audit event is missing user_id".into(),
            });
        }
        if event.digital_signature.is_empty() {
            return Err(VigilError::Validation {
                message: "audit event is missing digital_signature".into(),
            });
        }

        let id_str = event.event_id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('audit_event', $id) SET \
                 event_id = $event_id, \
                 transaction_id = $transaction_id, \
                 user_id = $user_id, \
                 actor_id = $actor_id, \
                 action_type = $action_type, \
                 resource_type = $resource_type, \
                 resource_id = $resource_id, \
                 service_source = $service_source, \
                 timestamp = $timestamp, \
                 result = $result, \
                 failure_reason = $failure_reason, \
                 ip_address = $ip_address, \
                 geolocation = $geolocation, \
                 user_agent = $user_agent, \
                 request_id = $request_id, \
                 session_id = $session_id, \
                 digital_signature = $digital_signature, \
                 metadata = $metadata, \
                 data_before = $data_before, \
                 data_after = $data_after, \
                 compliance_flags = $compliance_flags, \
                 retention_category = $retention_category, \
                 encryption_key_id = $encryption_key_id, \
                 created_at = $created_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("event_id", id_str.clone()))
            .bind(("transaction_id", event.transaction_id.map(|u| u.to_string())))
            .bind(("user_id", event.user_id.to_string()))
            .bind(("actor_id", event.actor_id.map(|u| u.to_string())))
            .bind(("action_type", event.action_type.as_str().to_owned()))
            .bind(("resource_type", event.resource_type.as_str().to_owned()))
            .bind(("resource_id", event.resource_id.clone()))
            .bind(("service_source", event.service_source.clone()))
            .bind(("timestamp", event.timestamp))
            .bind(("result", event.result.as_str().to_owned()))
            .bind(("failure_reason", event.failure_reason.clone()))
            .bind(("ip_address", event.ip_address.clone()))
            .bind(("geolocation", event.geolocation.clone()))
            .bind(("user_agent", event.user_agent.clone()))
            .bind(("request_id", event.request_id.clone()))
            .bind(("session_id", event.session_id.clone()))
            .bind(("metadata", event.metadata.clone()))
            .bind(("digital_signature", event.digital_signature.clone()))
            .bind(("data_before", event.data_before.clone().map(Bytes::from)))
            .bind(("data_after", event.data_after.clone().map(Bytes::from)))
            .bind(("compliance_flags", event.compliance_flags.clone()))
            .bind((
                "retention_category",
                event.retention_category.as_str().to_owned(),
            ))
            .bind(("encryption_key_id", event.encryption_key_id))
            .bind(("created_at", event.created_at))
            .await
            .map_err(DbError::from)?;

        if let Err(e) = result.check() {
            let message = e.to_string();
            if message.contains("already exists") {
                return Err(DbError::Duplicate {
                    entity: TABLE.into(),
                    id: id_str,
                }
                .into());
            }
            return Err(DbError::Query(message).into());
        }

        Ok(())
    }

    async fn query(&self, filter: &AuditEventFilter) -> VigilResult<AuditEventPage> {
        let conditions = filter_conditions(filter);
        let where_sql = where_clause(&conditions);

        let count_sql = format!(
            "SELECT count() AS total FROM {TABLE}{where_sql} GROUP ALL"
        );
        let page_sql = format!(
            "SELECT * FROM {TABLE}{where_sql} \
             ORDER BY timestamp DESC, event_id DESC \
             LIMIT $limit START $offset"
        );

        // Total and page share the WHERE clause and travel in one
        // request. A zero limit still reports an accurate total.
        let mut request = self.db.query(count_sql);
        if filter.limit > 0 {
            request = request
                .query(page_sql)
                .bind(("limit", filter.limit))
                .bind(("offset", filter.offset));
        }
        let mut result = bind_filter(request, filter)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total_count = count_rows.first().map(|r| r.total).unwrap_or(0);

        let events = if filter.limit > 0 {
            let rows: Vec<AuditEventRow> = result.take(1).map_err(DbError::from)?;
            rows.into_iter()
                .map(AuditEventRow::try_into_event)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        let has_more = total_count > filter.offset + events.len() as u64;

        Ok(AuditEventPage {
            events,
            total_count,
            page_size: filter.limit,
            has_more,
        })
    }

    async fn tail_signature(&self) -> VigilResult<String> {
        let mut result = self
            .db
            .query(
                "SELECT digital_signature, timestamp FROM audit_event \
                 ORDER BY timestamp DESC LIMIT 1",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SignatureRow> = result.take(0).map_err(DbError::from)?;
        // Genesis case: an empty ledger has the empty signature.
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.digital_signature)
            .unwrap_or_default())
    }
}
