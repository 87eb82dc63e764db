//! Directory-rooted archive sink.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::info;
use vigil_core::repository::ArchiveSink;
use vigil_core::{AuditEvent, VigilError, VigilResult};

use crate::{batch_key, report_key};

/// Archive sink writing time-partitioned JSON objects under a root
/// directory. Keys map one-to-one onto relative paths; `create_new`
/// enforces write-once.
#[derive(Debug, Clone)]
pub struct FsArchiveSink {
    root: PathBuf,
}

impl FsArchiveSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn put(&self, key: &str, data: &[u8]) -> VigilResult<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VigilError::Archive(format!("create {}: {e}", parent.display())))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    VigilError::Archive(format!("archive key {key} already written"))
                } else {
                    VigilError::Archive(format!("open {}: {e}", path.display()))
                }
            })?;

        file.write_all(data)
            .await
            .map_err(|e| VigilError::Archive(format!("write {}: {e}", path.display())))?;
        file.sync_all()
            .await
            .map_err(|e| VigilError::Archive(format!("sync {}: {e}", path.display())))?;

        Ok(())
    }
}

impl ArchiveSink for FsArchiveSink {
    async fn archive_batch(&self, events: &[AuditEvent], batch_id: &str) -> VigilResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let data = serde_json::to_vec(events)
            .map_err(|e| VigilError::Archive(format!("serialize batch {batch_id}: {e}")))?;
        let key = batch_key(batch_id);
        self.put(&key, &data).await?;

        info!(key = %key, events = events.len(), "archived event batch");
        Ok(())
    }

    async fn store_report(&self, name: &str, data: &[u8]) -> VigilResult<()> {
        let key = report_key(name);
        self.put(&key, data).await?;

        info!(key = %key, bytes = data.len(), "stored report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use vigil_core::{ActionType, ResourceType};

    fn sample_event() -> AuditEvent {
        let mut event = AuditEvent::new(
            Uuid::new_v4(),
            ActionType::Export,
            ResourceType::Report,
            "report-1",
        );
        event.digital_signature = "cafe".into();
        event
    }

    #[tokio::test]
    async fn batch_lands_under_dated_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArchiveSink::new(dir.path());

        sink.archive_batch(&[sample_event()], "batch-1").await.unwrap();

        let key = crate::batch_key("batch-1");
        let raw = tokio::fs::read(dir.path().join(&key)).await.unwrap();
        let decoded: Vec<AuditEvent> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(decoded.len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArchiveSink::new(dir.path());

        sink.archive_batch(&[], "batch-empty").await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_batch_key_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArchiveSink::new(dir.path());

        sink.archive_batch(&[sample_event()], "batch-2").await.unwrap();
        let err = sink
            .archive_batch(&[sample_event()], "batch-2")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ARCHIVE");
        assert!(err.to_string().contains("already written"));
    }

    #[tokio::test]
    async fn reports_land_under_reports_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArchiveSink::new(dir.path());

        sink.store_report("sar-2024.pdf", b"pdf-bytes").await.unwrap();

        let key = crate::report_key("sar-2024.pdf");
        let raw = tokio::fs::read(dir.path().join(&key)).await.unwrap();
        assert_eq!(raw, b"pdf-bytes");
    }
}
