use crate::core::{PageResult, ParseError};
use crate::http::RawPage;
use url::Url;

/// Turns one page of raw HTML into listings for a particular site.
///
/// A well-formed page with no listing nodes yields an empty [`PageResult`];
/// that is how the end of the results is detected. `ParseError` is reserved
/// for bodies that are not HTML at all.
pub trait ListingExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(
        &self,
        raw_html: &str,
        page_url: &Url,
        page_index: usize,
    ) -> Result<PageResult, ParseError>;

    fn extract_page(&self, page: &RawPage) -> Result<PageResult, ParseError> {
        self.extract(page.text()?, &page.url, page.page_index)
    }
}
