use serde::{Deserialize, Serialize};
use url::Url;

use super::{DetailExtractor, ListingExtractor, SelectorExtractor};
use crate::core::ConfigError;

/// How the link of a listing is located.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorLookup {
    /// Closest `<a>` enclosing the title element, the title element included.
    #[default]
    Ancestor,
    /// First element matching the selector inside the listing node.
    Within(String),
}

fn default_link_attribute() -> String {
    "href".to_string()
}

/// Label and value elements of a characteristics block. The n-th label pairs
/// with the n-th value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRules {
    pub label_selector: String,
    pub value_selector: String,
}

/// Selectors for the page of a single listing. The first match of each
/// selector is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRules {
    #[serde(default)]
    pub address_selector: Option<String>,
    #[serde(default)]
    pub price_selector: Option<String>,
    #[serde(default)]
    pub price_per_m2_selector: Option<String>,
    #[serde(default)]
    pub attributes: Option<AttributeRules>,
}

impl DetailRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address_selector(mut self, selector: &str) -> Self {
        self.address_selector = Some(selector.to_string());
        self
    }

    pub fn with_price_selector(mut self, selector: &str) -> Self {
        self.price_selector = Some(selector.to_string());
        self
    }

    pub fn with_price_per_m2_selector(mut self, selector: &str) -> Self {
        self.price_per_m2_selector = Some(selector.to_string());
        self
    }

    pub fn with_attributes(mut self, label_selector: &str, value_selector: &str) -> Self {
        self.attributes = Some(AttributeRules {
            label_selector: label_selector.to_string(),
            value_selector: value_selector.to_string(),
        });
        self
    }
}

/// Selector rules for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorRules {
    pub listing_selector: String,
    /// Relative to the listing node. `None` uses the listing node itself.
    #[serde(default)]
    pub title_selector: Option<String>,
    /// Read the title from this attribute instead of the element text.
    #[serde(default)]
    pub title_attribute: Option<String>,
    #[serde(default)]
    pub anchor: AnchorLookup,
    #[serde(default = "default_link_attribute")]
    pub link_attribute: String,
    /// Number of characters dropped from the raw link value before it is
    /// resolved. Some sites wrap their links in a fixed redirect prefix.
    #[serde(default)]
    pub href_prefix_len: usize,
    /// Base for relative links. `None` resolves against the fetched page URL.
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Items of the pagination widget. The highest number among them bounds
    /// the crawl together with `max_pages`.
    #[serde(default)]
    pub pagination_selector: Option<String>,
    /// Used when the crawl enriches listings from their own pages.
    #[serde(default)]
    pub details: Option<DetailRules>,
}

impl ExtractorRules {
    pub fn new(listing_selector: &str) -> Self {
        Self {
            listing_selector: listing_selector.to_string(),
            title_selector: None,
            title_attribute: None,
            anchor: AnchorLookup::Ancestor,
            link_attribute: default_link_attribute(),
            href_prefix_len: 0,
            base_url: None,
            pagination_selector: None,
            details: None,
        }
    }

    pub fn with_title_selector(mut self, selector: &str) -> Self {
        self.title_selector = Some(selector.to_string());
        self
    }

    pub fn with_title_attribute(mut self, attribute: &str) -> Self {
        self.title_attribute = Some(attribute.to_string());
        self
    }

    pub fn with_anchor(mut self, anchor: AnchorLookup) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_link_attribute(mut self, attribute: &str) -> Self {
        self.link_attribute = attribute.to_string();
        self
    }

    pub fn with_href_prefix_len(mut self, len: usize) -> Self {
        self.href_prefix_len = len;
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_pagination_selector(mut self, selector: &str) -> Self {
        self.pagination_selector = Some(selector.to_string());
        self
    }

    pub fn with_details(mut self, details: DetailRules) -> Self {
        self.details = Some(details);
        self
    }
}

fn imovirtual_details() -> DetailRules {
    DetailRules::new()
        .with_address_selector("div.css-z9gx1y.e3ustps0")
        .with_price_selector("strong.css-t3wmkv.e1l1avn10")
        .with_price_per_m2_selector("div.css-1h1l5lm.efcnut39")
        .with_attributes("div.css-o4i8bk.e1qm3vsd1", "div.css-1ytkscc.e1qm3vsd3")
}

/// The site-specific extraction to use for a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorVariant {
    Imovirtual,
    Idealista,
    Custom(ExtractorRules),
}

impl ExtractorVariant {
    pub fn name(&self) -> &str {
        match self {
            ExtractorVariant::Imovirtual => "imovirtual",
            ExtractorVariant::Idealista => "idealista",
            ExtractorVariant::Custom(_) => "custom",
        }
    }

    pub fn rules(&self) -> ExtractorRules {
        match self {
            // Titles are spans nested inside the listing link.
            ExtractorVariant::Imovirtual => {
                ExtractorRules::new("span.offer-item-title").with_details(imovirtual_details())
            }
            ExtractorVariant::Idealista => ExtractorRules::new("article.item")
                .with_title_selector("a.item-link")
                .with_anchor(AnchorLookup::Within("a.item-link".to_string())),
            ExtractorVariant::Custom(rules) => rules.clone(),
        }
    }

    pub fn build(&self) -> Result<Box<dyn ListingExtractor>, ConfigError> {
        Ok(Box::new(SelectorExtractor::new(self.name(), self.rules())?))
    }

    pub fn build_details(&self) -> Result<DetailExtractor, ConfigError> {
        match self.rules().details {
            Some(rules) => DetailExtractor::new(&rules),
            None => Err(ConfigError::MissingDetailRules(self.name().to_string())),
        }
    }
}
