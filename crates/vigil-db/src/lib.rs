//! VIGIL Database — SurrealDB connection management and store
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Store implementations for the `vigil-core` contracts
//! - Error types ([`DbError`])
//!
//! The authoritative `audit_event` table is append-only: the schema denies
//! UPDATE and DELETE at the permission layer and the [`SurrealLedgerStore`]
//! contract exposes neither operation. Deployments must additionally run
//! the service under a database principal restricted to CREATE/SELECT on
//! that table; [`DbManager::connect`] warns when it can see broader
//! privileges.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{SurrealAccessLogStore, SurrealLedgerStore, SurrealSearchProjection};
pub use schema::{run_migrations, schema_v1};
