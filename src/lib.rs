pub mod core;
pub mod http;
pub mod logging;
pub mod parser;
pub mod scrapers;
pub mod stats;
pub mod storage;

pub use core::{crawl, crawl_all, Crawler};
pub use core::{
    CrawlConfig, CrawlError, CrawlPlan, CrawlReport, CrawlResult, CrawlState, Listing,
    ListingDetails,
};
pub use http::{PageRequest, RawPage};
pub use parser::{ExtractorVariant, ListingExtractor};
pub use scrapers::Scraper;
pub use stats::StatsTracker;
pub use storage::{JsonFileSink, ResultSink};
