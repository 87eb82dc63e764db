//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity. UUIDs
//! are stored as strings. Enums are stored as strings, with ASSERT
//! constraints only where the vocabulary is closed — `action_type` and
//! `resource_type` accept unregistered upstream values by design.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Audit events (authoritative ledger, append-only)
--
-- UPDATE and DELETE are denied at the permission layer. The deployment
-- must also restrict the service principal to CREATE/SELECT; root
-- connections bypass table permissions entirely.
-- =======================================================================
DEFINE TABLE audit_event SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD event_id ON TABLE audit_event TYPE string;
DEFINE FIELD transaction_id ON TABLE audit_event TYPE option<string>;
DEFINE FIELD user_id ON TABLE audit_event TYPE string;
DEFINE FIELD actor_id ON TABLE audit_event TYPE option<string>;
DEFINE FIELD action_type ON TABLE audit_event TYPE string;
DEFINE FIELD resource_type ON TABLE audit_event TYPE string;
DEFINE FIELD resource_id ON TABLE audit_event TYPE string;
DEFINE FIELD service_source ON TABLE audit_event TYPE string;
DEFINE FIELD timestamp ON TABLE audit_event TYPE datetime;
DEFINE FIELD result ON TABLE audit_event TYPE string \
    ASSERT $value IN ['SUCCESS', 'FAILURE', 'PENDING', 'DENIED'];
DEFINE FIELD failure_reason ON TABLE audit_event TYPE option<string>;
DEFINE FIELD ip_address ON TABLE audit_event TYPE option<string>;
DEFINE FIELD geolocation ON TABLE audit_event TYPE option<string>;
DEFINE FIELD user_agent ON TABLE audit_event TYPE option<string>;
DEFINE FIELD request_id ON TABLE audit_event TYPE string;
DEFINE FIELD session_id ON TABLE audit_event TYPE option<string>;
DEFINE FIELD digital_signature ON TABLE audit_event TYPE string;
DEFINE FIELD metadata ON TABLE audit_event TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD data_before ON TABLE audit_event TYPE option<bytes>;
DEFINE FIELD data_after ON TABLE audit_event TYPE option<bytes>;
DEFINE FIELD compliance_flags ON TABLE audit_event TYPE array \
    DEFAULT [];
DEFINE FIELD compliance_flags.* ON TABLE audit_event TYPE string;
DEFINE FIELD retention_category ON TABLE audit_event TYPE string \
    ASSERT $value IN ['STANDARD', 'TRANSACTION', 'KYC', 'LOGIN', \
    'REPORT', 'DELETED_GRACE'];
DEFINE FIELD encryption_key_id ON TABLE audit_event TYPE int;
DEFINE FIELD created_at ON TABLE audit_event TYPE datetime;
DEFINE INDEX idx_audit_event_id ON TABLE audit_event \
    COLUMNS event_id UNIQUE;
DEFINE INDEX idx_audit_transaction ON TABLE audit_event \
    COLUMNS transaction_id;
DEFINE INDEX idx_audit_user ON TABLE audit_event COLUMNS user_id;
DEFINE INDEX idx_audit_timestamp ON TABLE audit_event COLUMNS timestamp;
DEFINE INDEX idx_audit_action ON TABLE audit_event COLUMNS action_type;

-- =======================================================================
-- Access log (audit of audits, append-only, no signature chain)
-- =======================================================================
DEFINE TABLE access_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD access_id ON TABLE access_log TYPE string;
DEFINE FIELD accessor_id ON TABLE access_log TYPE string;
DEFINE FIELD accessor_role ON TABLE access_log TYPE string;
DEFINE FIELD access_type ON TABLE access_log TYPE string \
    ASSERT $value IN ['VIEW', 'EXPORT', 'SEARCH'];
DEFINE FIELD query_filter ON TABLE access_log TYPE string;
DEFINE FIELD records_viewed ON TABLE access_log TYPE int;
DEFINE FIELD ip_address ON TABLE access_log TYPE string;
DEFINE FIELD timestamp ON TABLE access_log TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD purpose ON TABLE access_log TYPE string;
DEFINE INDEX idx_access_timestamp ON TABLE access_log COLUMNS timestamp;
DEFINE INDEX idx_access_accessor ON TABLE access_log COLUMNS accessor_id;

-- =======================================================================
-- Search projection (derived, rebuildable, never authoritative)
-- =======================================================================
DEFINE ANALYZER audit_text TOKENIZERS class FILTERS lowercase, ascii;
DEFINE TABLE search_event SCHEMAFULL;
DEFINE FIELD event_id ON TABLE search_event TYPE string;
DEFINE FIELD timestamp ON TABLE search_event TYPE datetime;
DEFINE FIELD search_text ON TABLE search_event TYPE string;
DEFINE FIELD document ON TABLE search_event TYPE object FLEXIBLE;
DEFINE INDEX idx_search_event_id ON TABLE search_event \
    COLUMNS event_id UNIQUE;
DEFINE INDEX idx_search_text ON TABLE search_event \
    COLUMNS search_text FULLTEXT ANALYZER audit_text BM25;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies each
/// migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that bypass
/// the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
