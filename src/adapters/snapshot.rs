use crate::core::SourceClient;
use crate::domain::model::{Source, SourceBatch};
use crate::utils::error::{Result, SyncError};
use std::path::PathBuf;

/// Reads a previously captured `SourceBatch` from a JSON file instead of
/// calling the live API.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    source: Source,
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(source: Source, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl SourceClient for SnapshotSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self) -> Result<SourceBatch> {
        tracing::debug!("Reading {} snapshot from {}", self.source, self.path.display());

        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SyncError::source_failure(
                self.source,
                format!("cannot read snapshot {}: {}", self.path.display(), e),
            )
        })?;

        let batch: SourceBatch = serde_json::from_str(&content).map_err(|e| {
            SyncError::source_failure(
                self.source,
                format!("invalid snapshot {}: {}", self.path.display(), e),
            )
        })?;

        let foreign = batch
            .customers
            .iter()
            .map(|c| c.source)
            .chain(batch.orders.iter().map(|o| o.source))
            .chain(std::iter::once(batch.source))
            .find(|s| *s != self.source);
        if let Some(other) = foreign {
            return Err(SyncError::source_failure(
                self.source,
                format!("snapshot contains {} records", other),
            ));
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_snapshot(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_valid_snapshot() {
        let file = write_snapshot(
            r#"{
                "source": "BigCommerce",
                "customers": [
                    {"external_id": "7", "name": "Jane Doe", "email": "jane@x.com", "source": "BigCommerce"}
                ],
                "orders": [
                    {"external_id": "100", "customer_external_id": "7",
                     "created_at": "Sat, 15 Jun 2024 09:00:00 +0000", "total": 20.5, "source": "BigCommerce"}
                ]
            }"#,
        );

        let batch = SnapshotSource::new(Source::BigCommerce, file.path())
            .fetch()
            .await
            .unwrap();

        assert_eq!(batch.customers.len(), 1);
        assert_eq!(batch.customers[0].phone, None);
        assert_eq!(batch.orders[0].total, Some(20.5));
        assert!(batch.orders[0].line_items.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unknown_fields() {
        let file = write_snapshot(
            r#"{
                "source": "Wave",
                "customers": [
                    {"external_id": "a1", "name": "Jane", "source": "Wave", "nickname": "JD"}
                ],
                "orders": []
            }"#,
        );

        let err = SnapshotSource::new(Source::Wave, file.path())
            .fetch()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nickname"));
    }

    #[tokio::test]
    async fn test_rejects_missing_required_fields() {
        let file = write_snapshot(
            r#"{"source": "Wave", "customers": [{"external_id": "a1", "source": "Wave"}], "orders": []}"#,
        );

        let result = SnapshotSource::new(Source::Wave, file.path()).fetch().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rejects_records_from_other_source() {
        let file = write_snapshot(
            r#"{"source": "Wave", "customers": [{"external_id": "7", "name": "X", "source": "BigCommerce"}], "orders": []}"#,
        );

        let result = SnapshotSource::new(Source::Wave, file.path()).fetch().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let err = SnapshotSource::new(Source::Wave, "/nonexistent/snapshot.json")
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::SourceError { origin: Source::Wave, .. }));
    }
}
