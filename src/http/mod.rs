pub(crate) mod request;
pub(crate) mod response;

pub use request::{PageRequest, RequestKind, UrlTemplate, PAGE_PLACEHOLDER};
pub use response::RawPage;
