use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::ConfigError;
use crate::http::UrlTemplate;
use crate::parser::ExtractorVariant;
use crate::scrapers::http_scraper::{parse_header, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

pub const DEFAULT_MAX_PAGES: usize = 20;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: usize = 1;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

fn default_name() -> String {
    "crawl".to_string()
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())])
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_start_page() -> usize {
    1
}

fn default_delay() -> Duration {
    DEFAULT_DELAY
}

fn default_max_consecutive_failures() -> usize {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Settings for one crawl session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub base_url_template: String,
    pub extractor: ExtractorVariant,
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
    /// Upper bound on the number of page indices visited.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_start_page")]
    pub start_page: usize,
    #[serde(
        rename = "inter_request_delay_ms",
        with = "duration_ms",
        default = "default_delay"
    )]
    pub inter_request_delay: Duration,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: usize,
    #[serde(
        rename = "request_timeout_ms",
        with = "duration_ms",
        default = "default_timeout"
    )]
    pub request_timeout: Duration,
    /// Visit every kept listing's own page and fill in its details.
    #[serde(default)]
    pub enrich_details: bool,
}

impl CrawlConfig {
    pub fn new(base_url_template: &str, extractor: ExtractorVariant) -> Self {
        Self {
            name: default_name(),
            base_url_template: base_url_template.to_string(),
            extractor,
            headers: default_headers(),
            max_pages: DEFAULT_MAX_PAGES,
            start_page: 1,
            inter_request_delay: DEFAULT_DELAY,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            request_timeout: DEFAULT_TIMEOUT,
            enrich_details: false,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_headers(mut self, headers: Vec<(&str, &str)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_start_page(mut self, start_page: usize) -> Self {
        self.start_page = start_page;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    pub fn with_max_consecutive_failures(mut self, failures: usize) -> Self {
        self.max_consecutive_failures = failures;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_enrich_details(mut self, enrich: bool) -> Self {
        self.enrich_details = enrich;
        self
    }

    /// Last page index the session is allowed to request.
    pub fn last_page(&self) -> usize {
        self.start_page.saturating_add(self.max_pages.saturating_sub(1))
    }

    /// Checks the settings and returns the parsed URL template.
    pub fn validate(&self) -> Result<UrlTemplate, ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroBound("max_pages"));
        }
        if self.start_page == 0 {
            return Err(ConfigError::ZeroBound("start_page"));
        }
        if self.max_consecutive_failures == 0 {
            return Err(ConfigError::ZeroBound("max_consecutive_failures"));
        }
        for (name, value) in &self.headers {
            parse_header(name, value).map_err(|reason| ConfigError::InvalidHeader {
                name: name.clone(),
                reason,
            })?;
        }
        UrlTemplate::parse(&self.base_url_template)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

/// A set of crawls read from a JSON file, e.g. one per property type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlPlan {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub crawls: Vec<CrawlConfig>,
}

impl CrawlPlan {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
