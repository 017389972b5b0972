use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// One extracted listing. Its identity is the `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub url: Url,
    /// 1-based index of the page the listing was first seen on.
    pub source_page: usize,
    /// Filled in from the listing's own page when detail enrichment is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ListingDetails>,
}

/// Values read from the page of a single listing. Prices are kept as shown on
/// the site, without the currency unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub full_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub price: Option<String>,
    pub price_per_m2: Option<String>,
    /// Label/value pairs from the characteristics block, e.g. `Tipo`.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingTitle,
    MissingAnchor,
    MissingLink,
    UnresolvableLink(String),
}

/// A listing node that matched the listing selector but could not be turned
/// into a [`Listing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNode {
    pub page_index: usize,
    /// Position of the node among the listing nodes of its page.
    pub position: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub page_index: usize,
    pub listings: Vec<Listing>,
    pub skipped: Vec<SkippedNode>,
    pub has_more: bool,
    /// Highest page number shown by the page's pagination widget, if any.
    pub last_page: Option<usize>,
}

impl PageResult {
    pub fn new(page_index: usize, listings: Vec<Listing>, skipped: Vec<SkippedNode>) -> Self {
        let has_more = !listings.is_empty();
        Self {
            page_index,
            listings,
            skipped,
            has_more,
            last_page: None,
        }
    }

    pub fn with_last_page(mut self, last_page: Option<usize>) -> Self {
        self.last_page = last_page;
        self
    }
}
