//! In-memory archive sink.
//!
//! Suitable for tests and single-process experiments; keeps the same
//! write-once key discipline as the durable sinks.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use vigil_core::repository::ArchiveSink;
use vigil_core::{AuditEvent, VigilError, VigilResult};

use crate::{batch_key, report_key};

#[derive(Debug, Clone, Default)]
pub struct MemoryArchiveSink {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryArchiveSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    /// Raw object bytes for a key.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    fn put(&self, key: String, data: Vec<u8>) -> VigilResult<()> {
        let mut objects = self.objects.lock();
        if objects.contains_key(&key) {
            return Err(VigilError::Archive(format!(
                "archive key {key} already written"
            )));
        }
        objects.insert(key, data);
        Ok(())
    }
}

impl ArchiveSink for MemoryArchiveSink {
    async fn archive_batch(&self, events: &[AuditEvent], batch_id: &str) -> VigilResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let data = serde_json::to_vec(events)
            .map_err(|e| VigilError::Archive(format!("serialize batch {batch_id}: {e}")))?;
        self.put(batch_key(batch_id), data)
    }

    async fn store_report(&self, name: &str, data: &[u8]) -> VigilResult<()> {
        self.put(report_key(name), data.to_vec())
    }
}
