use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, ClientBuilder};
use std::collections::HashMap;
use std::time::Duration;

use super::Scraper;
use crate::core::{ConfigError, NetworkError, NetworkErrorKind};
use crate::http::{PageRequest, RawPage};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain GET fetcher over reqwest. No cookies are kept between pages; headers
/// come with each [`PageRequest`].
#[derive(Clone)]
pub struct HttpScraper {
    client: Client,
}

impl HttpScraper {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
        let client = ClientBuilder::new()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    fn extract_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
            .collect()
    }
}

pub(crate) fn parse_header(
    key: &str,
    value: &str,
) -> Result<(header::HeaderName, header::HeaderValue), String> {
    let name = header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| e.to_string())?;
    let value = header::HeaderValue::from_str(value).map_err(|e| e.to_string())?;
    Ok((name, value))
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch_single(&self, request: PageRequest) -> Result<RawPage, NetworkError> {
        let page_index = request.page_index;
        let mut req = self.client.get(request.url.clone());

        for (key, value) in &request.headers {
            let (name, value) = parse_header(key, value).map_err(|reason| {
                NetworkError::new(
                    page_index,
                    NetworkErrorKind::InvalidHeader(format!("{}: {}", key, reason)),
                )
            })?;
            req = req.header(name, value);
        }

        let start_time = Utc::now();
        let response = req
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(page_index, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::new(
                page_index,
                NetworkErrorKind::Status(status.as_u16()),
            ));
        }

        let url = response.url().clone();
        let headers = Self::extract_headers(&response);
        let raw_body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::from_reqwest(page_index, e))?;

        let elapsed_ms = (Utc::now() - start_time).num_milliseconds();

        Ok(RawPage {
            page_index,
            url,
            status: status.as_u16(),
            headers,
            raw_body: raw_body.to_vec(),
            timestamp: start_time,
            elapsed_ms,
        })
    }
}
