use crate::core::session::CrawlReport;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkErrorKind {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// A page could not be fetched. Never retried by the fetcher itself.
#[derive(Error, Debug)]
#[error("failed to fetch page {page_index}: {kind}")]
pub struct NetworkError {
    pub page_index: usize,
    #[source]
    pub kind: NetworkErrorKind,
}

impl NetworkError {
    pub fn new(page_index: usize, kind: NetworkErrorKind) -> Self {
        Self { page_index, kind }
    }

    pub(crate) fn from_reqwest(page_index: usize, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if let Some(status) = err.status() {
            NetworkErrorKind::Status(status.as_u16())
        } else if err.is_connect() {
            NetworkErrorKind::Connection(err.to_string())
        } else {
            NetworkErrorKind::Transport(err)
        };
        Self { page_index, kind }
    }
}

/// The body of a page is not an HTML document. An HTML page without any
/// listings is not a parse error.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("page {page_index} does not contain any HTML markup")]
    NotHtml { page_index: usize },

    #[error("failed to decode body of page {page_index}: {reason}")]
    Decoding { page_index: usize, reason: String },
}

impl ParseError {
    pub fn page_index(&self) -> usize {
        match self {
            ParseError::NotHtml { page_index } | ParseError::Decoding { page_index, .. } => {
                *page_index
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl PageError {
    pub fn page_index(&self) -> usize {
        match self {
            PageError::Network(e) => e.page_index,
            PageError::Parse(e) => e.page_index(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("URL template must contain exactly one `{{page}}` placeholder, found {found}: {template}")]
    Placeholder { template: String, found: usize },

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("{0} must be at least 1")]
    ZeroBound(&'static str),

    #[error("extractor `{0}` has no rules for listing pages")]
    MissingDetailRules(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),
}

/// Terminal failure of a crawl session.
///
/// `Aborted` always carries whatever listings were gathered before the
/// session gave up, so callers should read it as "best-effort data included".
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid crawl configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("crawl aborted at page {page_index} after {consecutive_failures} consecutive failure(s): {source}")]
    Aborted {
        page_index: usize,
        consecutive_failures: usize,
        #[source]
        source: PageError,
        partial: Box<CrawlReport>,
    },
}

impl CrawlError {
    /// The report gathered before the session aborted, if it got that far.
    pub fn partial(&self) -> Option<&CrawlReport> {
        match self {
            CrawlError::Aborted { partial, .. } => Some(partial),
            CrawlError::Config(_) => None,
        }
    }

    pub fn into_partial(self) -> Option<CrawlReport> {
        match self {
            CrawlError::Aborted { partial, .. } => Some(*partial),
            CrawlError::Config(_) => None,
        }
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;
