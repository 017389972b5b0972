mod detail_extractor;
mod selector_extractor;

pub use detail_extractor::DetailExtractor;
pub use selector_extractor::SelectorExtractor;
