pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod links;
pub mod url_policy;

pub use error::{FetchError, Result};
pub use extractor::{ExtractorChain, PlainTextExtractor, ReadabilityExtractor, TextExtractor};
pub use fetcher::{HttpFetcher, PageFetcher, BROWSER_USER_AGENT};
pub use links::extract_links;
pub use url_policy::{is_same_domain, normalize_detail_url, paged_url, LinkFilter};
