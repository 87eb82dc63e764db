//! SurrealDB store implementations.

mod access_log;
mod ledger;
mod search;

pub use access_log::SurrealAccessLogStore;
pub use ledger::SurrealLedgerStore;
pub use search::SurrealSearchProjection;
