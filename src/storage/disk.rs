use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{ResultSink, StorageError};
use crate::core::CrawlReport;

/// Writes each report to `{base_path}/{name}_{timestamp}_{id}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    base_path: PathBuf,
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub async fn write(&self, report: &CrawlReport) -> Result<PathBuf, StorageError> {
        let timestamp = Utc::now();
        let id = Uuid::now_v7();
        let filename = format!(
            "{}_{}_{}.json",
            file_stem(&report.name),
            timestamp.format("%Y%m%d_%H%M%S"),
            id
        );
        let final_path = self.base_path.join(filename);

        let json = serde_json::json!({
            "id": id.to_string(),
            "name": report.name,
            "timestamp": timestamp,
            "data": report.listings,
            "metadata": {
                "state": report.state,
                "pages_fetched": report.pages_fetched,
                "skipped_pages": report.skipped_pages,
                "skipped_nodes": report.skipped_nodes,
                "duplicates_dropped": report.duplicates_dropped,
                "stats": report.stats,
            },
        });

        tokio::fs::write(&final_path, serde_json::to_string_pretty(&json)?).await?;
        info!(
            "[{}] Saved {} listings to {}",
            report.name,
            report.listings.len(),
            final_path.display()
        );
        Ok(final_path)
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn store(&self, report: &CrawlReport) -> Result<(), StorageError> {
        self.write(report).await.map(|_| ())
    }
}
