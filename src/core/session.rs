use serde::Serialize;
use std::collections::HashSet;
use url::Url;

use crate::core::{Listing, PageResult, SkippedNode};
use crate::stats::CrawlStats;

/// Ordered set of listings keyed by URL. The first listing seen for a URL is
/// kept and later ones are dropped.
#[derive(Debug, Clone, Default)]
pub struct ListingSet {
    listings: Vec<Listing>,
    seen: HashSet<Url>,
}

impl ListingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a listing with the same URL is already present.
    pub fn insert(&mut self, listing: Listing) -> bool {
        if !self.seen.insert(listing.url.clone()) {
            return false;
        }
        self.listings.push(listing);
        true
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.iter()
    }

    /// Callers must not change `url`, which is the key of the set.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Listing> {
        self.listings.iter_mut()
    }

    pub fn into_vec(self) -> Vec<Listing> {
        self.listings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrawlState {
    Running,
    StoppedByEmptyPage { page_index: usize },
    StoppedByMaxPages,
    StoppedByError { page_index: usize },
}

impl CrawlState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CrawlState::Running)
    }
}

/// Outcome of a crawl session, complete or partial.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub name: String,
    pub state: CrawlState,
    pub listings: Vec<Listing>,
    pub pages_fetched: usize,
    /// Pages that failed but did not reach the failure threshold.
    pub skipped_pages: Vec<usize>,
    pub skipped_nodes: Vec<SkippedNode>,
    pub duplicates_dropped: usize,
    pub stats: CrawlStats,
}

impl CrawlReport {
    pub fn into_listings(self) -> Vec<Listing> {
        self.listings
    }
}

/// State owned by a single crawl invocation.
#[derive(Debug)]
pub(crate) struct CrawlSession {
    name: String,
    accumulator: ListingSet,
    state: CrawlState,
    current_page: usize,
    consecutive_failures: usize,
    pages_fetched: usize,
    skipped_pages: Vec<usize>,
    skipped_nodes: Vec<SkippedNode>,
    duplicates_dropped: usize,
}

impl CrawlSession {
    pub(crate) fn new(name: &str, start_page: usize) -> Self {
        Self {
            name: name.to_string(),
            accumulator: ListingSet::new(),
            state: CrawlState::Running,
            current_page: start_page,
            consecutive_failures: 0,
            pages_fetched: 0,
            skipped_pages: Vec::new(),
            skipped_nodes: Vec::new(),
            duplicates_dropped: 0,
        }
    }

    pub(crate) fn current_page(&self) -> usize {
        self.current_page
    }

    pub(crate) fn state(&self) -> CrawlState {
        self.state
    }

    pub(crate) fn listing_count(&self) -> usize {
        self.accumulator.len()
    }

    pub(crate) fn listings_mut(&mut self) -> impl Iterator<Item = &mut Listing> {
        self.accumulator.iter_mut()
    }

    /// Merges a successfully extracted page. Returns `(kept, duplicates)`.
    pub(crate) fn merge(&mut self, page: PageResult) -> (usize, usize) {
        self.pages_fetched += 1;
        self.consecutive_failures = 0;
        self.skipped_nodes.extend(page.skipped);

        let mut kept = 0;
        let mut duplicates = 0;
        for listing in page.listings {
            if self.accumulator.insert(listing) {
                kept += 1;
            } else {
                duplicates += 1;
            }
        }
        self.duplicates_dropped += duplicates;
        (kept, duplicates)
    }

    /// Registers a failed page and returns the consecutive failure count.
    pub(crate) fn record_failure(&mut self, page_index: usize) -> usize {
        self.consecutive_failures += 1;
        self.skipped_pages.push(page_index);
        self.consecutive_failures
    }

    pub(crate) fn advance(&mut self) {
        self.current_page += 1;
    }

    pub(crate) fn stop(&mut self, state: CrawlState) {
        debug_assert!(state.is_terminal());
        self.state = state;
    }

    pub(crate) fn into_report(mut self, stats: CrawlStats) -> CrawlReport {
        // The page that ended the session is not a skipped page.
        if let CrawlState::StoppedByError { page_index } = self.state {
            if self.skipped_pages.last() == Some(&page_index) {
                self.skipped_pages.pop();
            }
        }

        CrawlReport {
            name: self.name,
            state: self.state,
            listings: self.accumulator.into_vec(),
            pages_fetched: self.pages_fetched,
            skipped_pages: self.skipped_pages,
            skipped_nodes: self.skipped_nodes,
            duplicates_dropped: self.duplicates_dropped,
            stats,
        }
    }
}
