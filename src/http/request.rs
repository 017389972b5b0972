use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use crate::core::{ConfigError, Listing};

pub const PAGE_PLACEHOLDER: &str = "{page}";

/// A listing URL with a single `{page}` placeholder, e.g.
/// `https://www.imovirtual.com/comprar/apartamento/?page={page}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let found = template.matches(PAGE_PLACEHOLDER).count();
        if found != 1 {
            return Err(ConfigError::Placeholder {
                template: template.to_string(),
                found,
            });
        }

        let template = Self(template.to_string());
        template.render(1)?;
        Ok(template)
    }

    pub fn render(&self, page_index: usize) -> Result<Url, ConfigError> {
        let raw = self.0.replace(PAGE_PLACEHOLDER, &page_index.to_string());
        Ok(Url::parse(&raw)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    ResultsPage,
    /// The page of a single listing. `page_index` is the results page the
    /// listing was found on.
    ListingDetail,
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page_index: usize,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub kind: RequestKind,
}

impl PageRequest {
    pub fn new(
        template: &UrlTemplate,
        page_index: usize,
        headers: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            page_index,
            url: template.render(page_index)?,
            headers,
            kind: RequestKind::ResultsPage,
        })
    }

    pub fn listing_detail(listing: &Listing, headers: BTreeMap<String, String>) -> Self {
        Self {
            page_index: listing.source_page,
            url: listing.url.clone(),
            headers,
            kind: RequestKind::ListingDetail,
        }
    }
}
