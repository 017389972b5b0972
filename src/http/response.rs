use chrono::{DateTime, Utc};
use std::collections::HashMap;
use url::Url;

use crate::core::ParseError;

/// Body and status of a successfully fetched page.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub page_index: usize,
    pub url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub raw_body: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl RawPage {
    pub fn text(&self) -> Result<&str, ParseError> {
        std::str::from_utf8(&self.raw_body).map_err(|e| ParseError::Decoding {
            page_index: self.page_index,
            reason: e.to_string(),
        })
    }
}
