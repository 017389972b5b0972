use futures::future::join_all;
use log::{debug, info, warn};
use tokio::time::sleep;

use crate::core::session::{CrawlReport, CrawlSession, CrawlState};
use crate::core::{CrawlConfig, CrawlError, CrawlResult, ListingDetails, PageError, PageResult};
use crate::http::PageRequest;
use crate::parser::{DetailExtractor, ListingExtractor};
use crate::scrapers::HttpScraper;
use crate::{Scraper, StatsTracker};

/// Drives paginated crawls: pages are requested in order, one at a time,
/// until an empty page, the page bound, or too many consecutive failures.
///
/// A `Crawler` holds no session state, so one instance can run several
/// sessions at once.
pub struct Crawler {
    scraper: Box<dyn Scraper>,
}

impl Crawler {
    pub fn new(scraper: Box<dyn Scraper>) -> Self {
        Self { scraper }
    }

    /// Runs a session with the extractor selected by `config.extractor`.
    pub async fn crawl(&self, config: &CrawlConfig) -> CrawlResult<CrawlReport> {
        let extractor = config.extractor.build()?;
        self.crawl_with(config, extractor.as_ref()).await
    }

    pub async fn crawl_with(
        &self,
        config: &CrawlConfig,
        extractor: &dyn ListingExtractor,
    ) -> CrawlResult<CrawlReport> {
        let template = config.validate()?;
        let details = if config.enrich_details {
            Some(config.extractor.build_details()?)
        } else {
            None
        };
        let mut last_page = config.last_page();

        let stats = StatsTracker::new();
        let mut session = CrawlSession::new(&config.name, config.start_page);

        info!(
            "[{}] Starting crawl with {} extractor: {}",
            config.name,
            extractor.name(),
            template
        );
        debug!(
            "[{}] pages {}..={}, delay {:?}, max consecutive failures {}",
            config.name,
            config.start_page,
            last_page,
            config.inter_request_delay,
            config.max_consecutive_failures
        );

        loop {
            let page_index = session.current_page();
            let request = PageRequest::new(&template, page_index, config.headers.clone())?;

            match self.fetch_page(request, extractor, &stats).await {
                Ok(page) => {
                    let has_more = page.has_more;
                    let site_last_page = page.last_page;
                    let skipped = page.skipped.len();
                    let (kept, duplicates) = session.merge(page);
                    stats.record_page_success(kept, duplicates, skipped);

                    if !has_more {
                        info!(
                            "[{}] No more results found at page {}. Stopping.",
                            config.name, page_index
                        );
                        session.stop(CrawlState::StoppedByEmptyPage { page_index });
                        break;
                    }

                    info!(
                        "[{}] Page {}: {} new listings, {} duplicates ({} total)",
                        config.name,
                        page_index,
                        kept,
                        duplicates,
                        session.listing_count()
                    );

                    if let Some(site_last_page) = site_last_page {
                        if site_last_page < last_page {
                            debug!(
                                "[{}] Site lists {} pages, lowering bound from {}",
                                config.name, site_last_page, last_page
                            );
                            last_page = site_last_page;
                        }
                    }

                    if page_index >= last_page {
                        session.stop(CrawlState::StoppedByMaxPages);
                        break;
                    }

                    sleep(config.inter_request_delay).await;
                }
                Err(error) => {
                    stats.record_page_failure();
                    let failures = session.record_failure(page_index);

                    if failures >= config.max_consecutive_failures {
                        warn!(
                            "[{}] Giving up at page {} after {} consecutive failure(s): {}",
                            config.name, page_index, failures, error
                        );
                        session.stop(CrawlState::StoppedByError { page_index });
                        let partial = finish(session, &stats);
                        return Err(CrawlError::Aborted {
                            page_index,
                            consecutive_failures: failures,
                            source: error,
                            partial: Box::new(partial),
                        });
                    }

                    warn!(
                        "[{}] Skipping page {} ({}/{} consecutive failures): {}",
                        config.name, page_index, failures, config.max_consecutive_failures, error
                    );

                    if page_index >= last_page {
                        session.stop(CrawlState::StoppedByMaxPages);
                        break;
                    }
                }
            }

            session.advance();
        }

        debug!("[{}] Session ended in state {:?}", config.name, session.state());

        if let Some(details) = &details {
            self.enrich(config, &mut session, details, &stats).await;
        }
        Ok(finish(session, &stats))
    }

    async fn fetch_page(
        &self,
        request: PageRequest,
        extractor: &dyn ListingExtractor,
        stats: &StatsTracker,
    ) -> Result<PageResult, PageError> {
        let raw_page = self.scraper.fetch(request, stats).await?;
        Ok(extractor.extract_page(&raw_page)?)
    }

    /// Visits the page of every kept listing, pausing before each request.
    /// A listing whose page fails keeps `details: None`.
    async fn enrich(
        &self,
        config: &CrawlConfig,
        session: &mut CrawlSession,
        details: &DetailExtractor,
        stats: &StatsTracker,
    ) {
        info!(
            "[{}] Fetching details of {} listings",
            config.name,
            session.listing_count()
        );

        for listing in session.listings_mut() {
            sleep(config.inter_request_delay).await;

            let request = PageRequest::listing_detail(listing, config.headers.clone());
            match self.fetch_details(request, details, stats).await {
                Ok(found) => {
                    listing.details = Some(found);
                    stats.record_details(true);
                }
                Err(error) => {
                    warn!("[{}] No details for {}: {}", config.name, listing.url, error);
                    stats.record_details(false);
                }
            }
        }
    }

    async fn fetch_details(
        &self,
        request: PageRequest,
        details: &DetailExtractor,
        stats: &StatsTracker,
    ) -> Result<ListingDetails, PageError> {
        let raw_page = self.scraper.fetch(request, stats).await?;
        Ok(details.extract_page(&raw_page)?)
    }
}

fn finish(session: CrawlSession, stats: &StatsTracker) -> CrawlReport {
    stats.finish();
    let report = session.into_report(stats.get_stats());
    stats.log_summary(&report.name);
    report
}

/// Crawls over HTTP with the headers and timeout from `config`.
pub async fn crawl(config: &CrawlConfig) -> CrawlResult<CrawlReport> {
    let scraper = HttpScraper::with_timeout(config.request_timeout)?;
    Crawler::new(Box::new(scraper)).crawl(config).await
}

/// Runs independent sessions concurrently. Each session has its own client
/// and accumulator; results come back in the order of `configs`.
pub async fn crawl_all(configs: &[CrawlConfig]) -> Vec<CrawlResult<CrawlReport>> {
    join_all(configs.iter().map(crawl)).await
}

#[cfg(test)]
mod tests;
