// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::OutputDocument;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use std::sync::Arc;
use tracing::info;

/// 输出文件写入器
///
/// 合并后的记录与元数据以格式化 JSON 写入 `output/{file_name}`。
#[derive(Clone)]
pub struct OutputWriter {
    storage: Arc<dyn StorageRepository>,
}

impl OutputWriter {
    pub fn new(storage: Arc<dyn StorageRepository>) -> Self {
        Self { storage }
    }

    pub fn key(file_name: &str) -> String {
        format!("output/{}", file_name)
    }

    /// 写入输出文件，返回文件位置
    pub async fn write(&self, file_name: &str, document: &OutputDocument) -> Result<String, StorageError> {
        let body = serde_json::to_vec_pretty(document).map_err(|e| StorageError::Other(e.to_string()))?;
        let key = Self::key(file_name);
        self.storage.save(&key, &body).await?;

        let location = self.storage.locate(&key);
        info!(
            "Wrote {} records to {}",
            document.metadata.total_records, location
        );
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::job::OutputMetadata;
    use crate::domain::models::product::ProductRecord;
    use crate::domain::models::statistics::RunStatistics;
    use crate::infrastructure::storage::LocalStorage;
    use chrono::Utc;

    #[tokio::test]
    async fn test_writes_records_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(Arc::new(LocalStorage::new(dir.path())));
        let document = OutputDocument {
            records: vec![ProductRecord::new("Milk", "Dairy", "booker")],
            metadata: OutputMetadata {
                site: "booker".to_string(),
                total_records: 1,
                timestamp: Utc::now(),
                images_enabled: false,
                persistence_enabled: true,
                persistence_degraded: false,
                statistics: RunStatistics::default(),
                categories: vec!["Dairy".to_string()],
            },
        };

        let path = writer.write("booker.json", &document).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["metadata"]["totalRecords"], 1);
        assert_eq!(parsed["metadata"]["imagesEnabled"], false);
        assert_eq!(parsed["records"][0]["name"], "Milk");
        assert!(path.ends_with("output/booker.json"));
    }
}
