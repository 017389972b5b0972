use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{ResultSink, StorageError};
use crate::core::CrawlReport;

/// Keeps reports in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<CrawlReport>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<CrawlReport> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn store(&self, report: &CrawlReport) -> Result<(), StorageError> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}
