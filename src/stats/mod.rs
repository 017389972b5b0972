use chrono::{DateTime, Duration, Utc};
use log::info;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub pages_requested: usize,
    pub pages_succeeded: usize,
    pub pages_failed: usize,
    pub listings_kept: usize,
    pub duplicates_dropped: usize,
    pub nodes_skipped: usize,
    pub bytes_downloaded: usize,
    pub details_fetched: usize,
    pub details_failed: usize,
    pub status_codes: BTreeMap<u16, usize>,
    pub average_response_time: f64, // in milliseconds
    #[serde(skip)]
    timed_responses: usize,
}

impl CrawlStats {
    fn empty() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            pages_requested: 0,
            pages_succeeded: 0,
            pages_failed: 0,
            listings_kept: 0,
            duplicates_dropped: 0,
            nodes_skipped: 0,
            bytes_downloaded: 0,
            details_fetched: 0,
            details_failed: 0,
            status_codes: BTreeMap::new(),
            average_response_time: 0.0,
            timed_responses: 0,
        }
    }
}

/// Counters of one crawl session. Cloning shares the underlying counters.
#[derive(Debug, Clone)]
pub struct StatsTracker {
    stats: Arc<RwLock<CrawlStats>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(CrawlStats::empty())),
        }
    }

    pub fn record_request(&self, status: u16, size: usize, duration: Duration) {
        let mut stats = self.stats.write();
        stats.pages_requested += 1;
        *stats.status_codes.entry(status).or_insert(0) += 1;
        stats.bytes_downloaded += size;

        stats.timed_responses += 1;
        let current_total = stats.average_response_time * (stats.timed_responses - 1) as f64;
        let new_duration = duration.num_milliseconds() as f64;
        stats.average_response_time = (current_total + new_duration) / stats.timed_responses as f64;
    }

    /// A non-2xx response. Counted by status but left out of the average
    /// response time, since its duration is unknown.
    pub fn record_failed_status(&self, status: u16) {
        let mut stats = self.stats.write();
        stats.pages_requested += 1;
        *stats.status_codes.entry(status).or_insert(0) += 1;
    }

    /// A request that never produced a response (timeout, connection refused).
    pub fn record_transport_failure(&self) {
        self.stats.write().pages_requested += 1;
    }

    pub fn record_page_success(&self, kept: usize, duplicates: usize, skipped: usize) {
        let mut stats = self.stats.write();
        stats.pages_succeeded += 1;
        stats.listings_kept += kept;
        stats.duplicates_dropped += duplicates;
        stats.nodes_skipped += skipped;
    }

    pub fn record_page_failure(&self) {
        self.stats.write().pages_failed += 1;
    }

    pub fn record_details(&self, fetched: bool) {
        let mut stats = self.stats.write();
        if fetched {
            stats.details_fetched += 1;
        } else {
            stats.details_failed += 1;
        }
    }

    pub fn finish(&self) {
        self.stats.write().end_time = Some(Utc::now());
    }

    pub fn get_stats(&self) -> CrawlStats {
        self.stats.read().clone()
    }

    pub fn log_summary(&self, name: &str) {
        let stats = self.stats.read();
        let duration = stats
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(stats.start_time);

        info!(
            "[{}] finished in {}s: {} pages requested ({} ok, {} failed), {} listings kept, {} duplicates dropped, {} nodes skipped",
            name,
            duration.num_seconds(),
            stats.pages_requested,
            stats.pages_succeeded,
            stats.pages_failed,
            stats.listings_kept,
            stats.duplicates_dropped,
            stats.nodes_skipped,
        );
        if stats.details_fetched + stats.details_failed > 0 {
            info!(
                "[{}] listing details: {} fetched, {} failed",
                name, stats.details_fetched, stats.details_failed
            );
        }
        info!(
            "[{}] downloaded {:.2} MB, average response time {:.2}ms, status codes {:?}",
            name,
            stats.bytes_downloaded as f64 / 1_000_000.0,
            stats.average_response_time,
            stats.status_codes,
        );
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
