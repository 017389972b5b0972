use log::{debug, trace, warn};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::core::{ConfigError, Listing, PageResult, ParseError, SkipReason, SkippedNode};
use crate::parser::{AnchorLookup, ExtractorRules, ListingExtractor};

enum AnchorMatch {
    Ancestor,
    Within(Selector),
}

/// [`ListingExtractor`] driven by CSS selectors from [`ExtractorRules`].
pub struct SelectorExtractor {
    name: String,
    rules: ExtractorRules,
    listing: Selector,
    title: Option<Selector>,
    anchor: AnchorMatch,
    pagination: Option<Selector>,
}

pub(super) fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

pub(super) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl SelectorExtractor {
    pub fn new(name: &str, rules: ExtractorRules) -> Result<Self, ConfigError> {
        let listing = compile(&rules.listing_selector)?;
        let title = rules.title_selector.as_deref().map(compile).transpose()?;
        let anchor = match &rules.anchor {
            AnchorLookup::Ancestor => AnchorMatch::Ancestor,
            AnchorLookup::Within(selector) => AnchorMatch::Within(compile(selector)?),
        };
        let pagination = rules.pagination_selector.as_deref().map(compile).transpose()?;

        Ok(Self {
            name: name.to_string(),
            rules,
            listing,
            title,
            anchor,
            pagination,
        })
    }

    fn title_element<'a>(&self, node: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match &self.title {
            Some(selector) => node.select(selector).next(),
            None => Some(node),
        }
    }

    fn title_text(&self, element: ElementRef<'_>) -> Option<String> {
        let raw = match &self.rules.title_attribute {
            Some(attribute) => element.value().attr(attribute)?.to_string(),
            None => element.text().collect::<String>(),
        };
        let title = normalize_whitespace(&raw);
        (!title.is_empty()).then_some(title)
    }

    fn anchor_element<'a>(
        &self,
        node: ElementRef<'a>,
        title: ElementRef<'a>,
    ) -> Option<ElementRef<'a>> {
        match &self.anchor {
            AnchorMatch::Ancestor => std::iter::once(title)
                .chain(title.ancestors().filter_map(ElementRef::wrap))
                .find(|element| element.value().name() == "a"),
            AnchorMatch::Within(selector) => node.select(selector).next(),
        }
    }

    /// Highest page number among the pagination items. Items such as "..." or
    /// "Seguinte" are ignored.
    fn last_page(&self, document: &Html) -> Option<usize> {
        document
            .select(self.pagination.as_ref()?)
            .filter_map(|item| item.text().collect::<String>().trim().parse::<usize>().ok())
            .max()
    }

    fn resolve_link(&self, raw: &str, page_url: &Url) -> Result<Url, SkipReason> {
        let link = raw.trim();
        let stripped = match link.char_indices().nth(self.rules.href_prefix_len) {
            Some((offset, _)) => &link[offset..],
            None if self.rules.href_prefix_len == 0 => link,
            None => "",
        };
        if stripped.is_empty() {
            return Err(SkipReason::UnresolvableLink(raw.to_string()));
        }

        let base = self.rules.base_url.as_ref().unwrap_or(page_url);
        base.join(stripped)
            .map_err(|_| SkipReason::UnresolvableLink(raw.to_string()))
    }

    fn extract_node(
        &self,
        node: ElementRef<'_>,
        page_url: &Url,
        page_index: usize,
    ) -> Result<Listing, SkipReason> {
        let title_element = self.title_element(node).ok_or(SkipReason::MissingTitle)?;
        let title = self
            .title_text(title_element)
            .ok_or(SkipReason::MissingTitle)?;
        let anchor = self
            .anchor_element(node, title_element)
            .ok_or(SkipReason::MissingAnchor)?;
        let link = anchor
            .value()
            .attr(&self.rules.link_attribute)
            .ok_or(SkipReason::MissingLink)?;
        let url = self.resolve_link(link, page_url)?;

        Ok(Listing {
            title,
            url,
            source_page: page_index,
            details: None,
        })
    }
}

impl ListingExtractor for SelectorExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(
        &self,
        raw_html: &str,
        page_url: &Url,
        page_index: usize,
    ) -> Result<PageResult, ParseError> {
        if !raw_html.contains('<') {
            return Err(ParseError::NotHtml { page_index });
        }

        trace!("Parsing HTML content of page {}: {}", page_index, raw_html);
        let document = Html::parse_document(raw_html);

        let mut listings = Vec::new();
        let mut skipped = Vec::new();
        for (position, node) in document.select(&self.listing).enumerate() {
            match self.extract_node(node, page_url, page_index) {
                Ok(listing) => listings.push(listing),
                Err(reason) => {
                    warn!(
                        "[{}] skipping listing node {} on page {}: {:?}",
                        self.name, position, page_index, reason
                    );
                    skipped.push(SkippedNode {
                        page_index,
                        position,
                        reason,
                    });
                }
            }
        }

        let last_page = self.last_page(&document);
        debug!(
            "[{}] page {}: {} listings, {} skipped, last page {:?}",
            self.name,
            page_index,
            listings.len(),
            skipped.len(),
            last_page
        );
        Ok(PageResult::new(page_index, listings, skipped).with_last_page(last_page))
    }
}
