pub mod config;
mod crawler;
mod errors;
mod listing;
pub mod session;

pub use config::{CrawlConfig, CrawlPlan};
pub use crawler::{crawl, crawl_all, Crawler};
pub use errors::{
    ConfigError, CrawlError, CrawlResult, NetworkError, NetworkErrorKind, PageError, ParseError,
};
pub use listing::{Listing, ListingDetails, PageResult, SkipReason, SkippedNode};
pub use session::{CrawlReport, CrawlState, ListingSet};
