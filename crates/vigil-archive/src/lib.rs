//! VIGIL Archive — cold-storage retention of event batches and generated
//! reports.
//!
//! Archive objects are written once and never rewritten: a repeated batch
//! key is a caller bug and is refused. The archive is not read back on any
//! normal path; it exists for regulator export and disaster recovery.
//!
//! Two [`ArchiveSink`] implementations are provided: a directory-rooted
//! object store for deployments without a dedicated object-storage
//! backend, and an in-memory store for tests. Both use the same
//! time-partitioned key layout (`YYYY/MM/DD/{batch_id}.json`, reports
//! under `reports/YYYY/MM/{name}`), so an S3-style adapter can slot in
//! behind the trait without changing callers.

mod fs;
mod memory;

pub use fs::FsArchiveSink;
pub use memory::MemoryArchiveSink;

use chrono::{Datelike, Utc};

/// Object key for an event batch archived today (UTC).
pub(crate) fn batch_key(batch_id: &str) -> String {
    let now = Utc::now();
    format!(
        "{}/{:02}/{:02}/{}.json",
        now.year(),
        now.month(),
        now.day(),
        batch_id
    )
}

/// Object key for a report stored this month (UTC).
pub(crate) fn report_key(name: &str) -> String {
    let now = Utc::now();
    format!("reports/{}/{:02}/{}", now.year(), now.month(), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_keys_are_day_partitioned() {
        let key = batch_key("batch-7");
        let now = Utc::now();
        assert!(key.starts_with(&format!("{}/", now.year())));
        assert!(key.ends_with("/batch-7.json"));
        assert_eq!(key.split('/').count(), 4);
    }

    #[test]
    fn report_keys_are_month_partitioned() {
        let key = report_key("ctr-2024-06.pdf");
        assert!(key.starts_with("reports/"));
        assert!(key.ends_with("/ctr-2024-06.pdf"));
        assert_eq!(key.split('/').count(), 4);
    }
}
