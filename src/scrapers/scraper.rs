use crate::core::{NetworkError, NetworkErrorKind};
use crate::http::{PageRequest, RawPage, RequestKind};
use crate::StatsTracker;
use async_trait::async_trait;
use log::{debug, info, warn};

/// Fetches one page. Implementations never retry: a failed page is reported
/// once and the crawler decides what to do with it.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch_single(&self, request: PageRequest) -> Result<RawPage, NetworkError>;

    /// Fetches `request` and records the outcome in the `stats` of the
    /// session that issued it.
    async fn fetch(
        &self,
        request: PageRequest,
        stats: &StatsTracker,
    ) -> Result<RawPage, NetworkError> {
        match request.kind {
            RequestKind::ResultsPage => {
                info!("Fetching page {}: {}", request.page_index, request.url)
            }
            RequestKind::ListingDetail => debug!("Fetching listing {}", request.url),
        }

        match self.fetch_single(request).await {
            Ok(page) => {
                debug!(
                    "Received page {}: status={}, body_length={}, elapsed={}ms",
                    page.page_index,
                    page.status,
                    page.raw_body.len(),
                    page.elapsed_ms
                );
                stats.record_request(
                    page.status,
                    page.raw_body.len(),
                    chrono::Duration::milliseconds(page.elapsed_ms),
                );
                Ok(page)
            }
            Err(e) => {
                warn!("{}", e);
                match &e.kind {
                    NetworkErrorKind::Status(status) => stats.record_failed_status(*status),
                    _ => stats.record_transport_failure(),
                }
                Err(e)
            }
        }
    }
}
