use async_trait::async_trait;
use thiserror::Error;

use crate::core::CrawlReport;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Destination for the listings of a finished (or aborted) crawl.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn store(&self, report: &CrawlReport) -> Result<(), StorageError>;
}
