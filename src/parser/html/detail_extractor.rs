use log::{debug, trace};
use scraper::{Html, Selector};

use super::selector_extractor::{compile, normalize_whitespace};
use crate::core::{ConfigError, ListingDetails, ParseError};
use crate::http::RawPage;
use crate::parser::DetailRules;

struct AttributeMatch {
    label: Selector,
    value: Selector,
}

/// Reads [`ListingDetails`] from the page of a single listing.
pub struct DetailExtractor {
    address: Option<Selector>,
    price: Option<Selector>,
    price_per_m2: Option<Selector>,
    attributes: Option<AttributeMatch>,
}

fn first_text(document: &Html, selector: Option<&Selector>) -> Option<String> {
    let element = document.select(selector?).next()?;
    let text = normalize_whitespace(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Drops a trailing currency unit such as `€` or `€/m²`.
fn strip_unit(price: String) -> String {
    match price.find('€') {
        Some(offset) => price[..offset].trim_end().to_string(),
        None => price,
    }
}

/// `"Rua X, Arroios, Lisboa"` is split into city `Arroios` and state `Lisboa`.
fn split_address(address: &str) -> (Option<String>, Option<String>) {
    let mut parts = address
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .rev();
    let state = parts.next().map(str::to_string);
    let city = parts.next().map(str::to_string);
    (city, state)
}

impl DetailExtractor {
    pub fn new(rules: &DetailRules) -> Result<Self, ConfigError> {
        let attributes = match &rules.attributes {
            Some(attributes) => Some(AttributeMatch {
                label: compile(&attributes.label_selector)?,
                value: compile(&attributes.value_selector)?,
            }),
            None => None,
        };

        Ok(Self {
            address: rules.address_selector.as_deref().map(compile).transpose()?,
            price: rules.price_selector.as_deref().map(compile).transpose()?,
            price_per_m2: rules.price_per_m2_selector.as_deref().map(compile).transpose()?,
            attributes,
        })
    }

    /// Missing elements leave their field empty. Only a body that is not HTML
    /// is an error.
    pub fn extract(&self, raw_html: &str, page_index: usize) -> Result<ListingDetails, ParseError> {
        if !raw_html.contains('<') {
            return Err(ParseError::NotHtml { page_index });
        }

        trace!("Parsing listing page: {}", raw_html);
        let document = Html::parse_document(raw_html);

        let full_address = first_text(&document, self.address.as_ref());
        let (city, state) = full_address
            .as_deref()
            .map(split_address)
            .unwrap_or((None, None));

        let mut details = ListingDetails {
            full_address,
            city,
            state,
            price: first_text(&document, self.price.as_ref()).map(strip_unit),
            price_per_m2: first_text(&document, self.price_per_m2.as_ref()).map(strip_unit),
            ..ListingDetails::default()
        };

        if let Some(attributes) = &self.attributes {
            let labels = document.select(&attributes.label).map(|label| {
                normalize_whitespace(&label.text().collect::<String>())
                    .trim_end_matches(':')
                    .to_string()
            });
            let values = document
                .select(&attributes.value)
                .map(|value| normalize_whitespace(&value.text().collect::<String>()));

            details.attributes = labels
                .zip(values)
                .filter(|(label, _)| !label.is_empty())
                .collect();
        }

        debug!(
            "listing details: address={:?}, price={:?}, {} attributes",
            details.full_address,
            details.price,
            details.attributes.len()
        );
        Ok(details)
    }

    pub fn extract_page(&self, page: &RawPage) -> Result<ListingDetails, ParseError> {
        self.extract(page.text()?, page.page_index)
    }
}
