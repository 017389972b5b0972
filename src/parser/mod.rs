pub mod base;
pub mod html;
pub mod sites;

pub use base::ListingExtractor;
pub use html::{DetailExtractor, SelectorExtractor};
pub use sites::{AnchorLookup, AttributeRules, DetailRules, ExtractorRules, ExtractorVariant};
