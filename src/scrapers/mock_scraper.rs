use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use super::Scraper;
use crate::core::{NetworkError, NetworkErrorKind};
use crate::http::{PageRequest, RawPage, RequestKind};

const EMPTY_PAGE: &str = "<html><body></body></html>";

#[derive(Debug, Clone)]
pub enum MockResponse {
    Html(String),
    Status(u16),
    Timeout,
    ConnectionRefused,
}

/// Scripted fetcher. Results pages are keyed by page index and served as an
/// empty, well-formed document when unscripted. Listing pages are keyed by
/// URL and answer 404 when unscripted.
#[derive(Clone)]
pub struct MockScraper {
    responses: Arc<HashMap<usize, MockResponse>>,
    listings: Arc<HashMap<Url, MockResponse>>,
    requested: Arc<Mutex<Vec<usize>>>,
    requested_listings: Arc<Mutex<Vec<Url>>>,
}

impl MockScraper {
    pub fn new(responses: HashMap<usize, MockResponse>) -> Self {
        Self {
            responses: Arc::new(responses),
            listings: Arc::new(HashMap::new()),
            requested: Arc::new(Mutex::new(Vec::new())),
            requested_listings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            pages
                .into_iter()
                .enumerate()
                .map(|(i, html)| (i + 1, MockResponse::Html(html.into())))
                .collect(),
        )
    }

    pub fn with_listing_pages(mut self, listings: HashMap<Url, MockResponse>) -> Self {
        self.listings = Arc::new(listings);
        self
    }

    /// Results page indices requested so far, in request order. Shared
    /// between clones.
    pub fn requested_pages(&self) -> Vec<usize> {
        self.requested.lock().clone()
    }

    pub fn requested_listings(&self) -> Vec<Url> {
        self.requested_listings.lock().clone()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch_single(&self, request: PageRequest) -> Result<RawPage, NetworkError> {
        let page_index = request.page_index;
        let response = match request.kind {
            RequestKind::ResultsPage => {
                self.requested.lock().push(page_index);
                self.responses.get(&page_index).cloned()
            }
            RequestKind::ListingDetail => {
                self.requested_listings.lock().push(request.url.clone());
                Some(
                    self.listings
                        .get(&request.url)
                        .cloned()
                        .unwrap_or(MockResponse::Status(404)),
                )
            }
        };

        let body = match response {
            Some(MockResponse::Html(body)) => body,
            Some(MockResponse::Status(status)) => {
                return Err(NetworkError::new(
                    page_index,
                    NetworkErrorKind::Status(status),
                ))
            }
            Some(MockResponse::Timeout) => {
                return Err(NetworkError::new(page_index, NetworkErrorKind::Timeout))
            }
            Some(MockResponse::ConnectionRefused) => {
                return Err(NetworkError::new(
                    page_index,
                    NetworkErrorKind::Connection("connection refused".to_string()),
                ))
            }
            None => EMPTY_PAGE.to_string(),
        };

        Ok(RawPage {
            page_index,
            url: request.url,
            status: 200,
            headers: HashMap::new(),
            raw_body: body.into_bytes(),
            timestamp: Utc::now(),
            elapsed_ms: 0,
        })
    }
}
