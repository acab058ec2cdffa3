// Page text extraction.
//
// Two strategies behind one trait:
// - ReadabilityExtractor: main article body via spider_transformations Readability
// - PlainTextExtractor: every visible text node on the page
//
// ExtractorChain runs them in order and takes the first non-empty text.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Node};
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::fetcher::PageFetcher;

/// Elements whose text content never renders.
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Readable text of the page at `url`. `Ok(None)` when the page is
    /// forbidden or yields no text.
    async fn extract(&self, url: &str) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// Readability
// ---------------------------------------------------------------------------

pub struct ReadabilityExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl ReadabilityExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl TextExtractor for ReadabilityExtractor {
    fn name(&self) -> &'static str {
        "readability"
    }

    async fn extract(&self, url: &str) -> Result<Option<String>> {
        let Some(html) = self.fetcher.fetch(url).await? else {
            return Ok(None);
        };
        Ok(non_empty(article_text(&html, url)))
    }
}

/// Main article body as plain text, boilerplate removed.
fn article_text(html: &str, page_url: &str) -> String {
    let base = Url::parse(page_url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Text,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: base.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    transform_content_input(input, &config)
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

pub struct PlainTextExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl PlainTextExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain_text"
    }

    async fn extract(&self, url: &str) -> Result<Option<String>> {
        let Some(html) = self.fetcher.fetch(url).await? else {
            return Ok(None);
        };
        Ok(non_empty(visible_text(&html)))
    }
}

/// All text nodes outside script-like elements, in document order.
///
/// Adjacent inline nodes are concatenated as-is so a word split across tags
/// stays whole. Blank lines are dropped and each line is trimmed.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
        }
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Ordered fallback over several extractors.
pub struct ExtractorChain {
    strategies: Vec<Arc<dyn TextExtractor>>,
}

impl ExtractorChain {
    pub fn new(strategies: Vec<Arc<dyn TextExtractor>>) -> Self {
        Self { strategies }
    }

    /// Readability first, then plain visible text.
    pub fn standard(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new(vec![
            Arc::new(ReadabilityExtractor::new(fetcher.clone())),
            Arc::new(PlainTextExtractor::new(fetcher)),
        ])
    }

    pub fn push(mut self, strategy: Arc<dyn TextExtractor>) -> Self {
        self.strategies.push(strategy);
        self
    }
}

#[async_trait]
impl TextExtractor for ExtractorChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn extract(&self, url: &str) -> Result<Option<String>> {
        let last = self.strategies.len().saturating_sub(1);

        for (i, strategy) in self.strategies.iter().enumerate() {
            match strategy.extract(url).await {
                Ok(Some(text)) => {
                    debug!(url, strategy = strategy.name(), chars = text.len(), "Text extracted");
                    return Ok(Some(text));
                }
                Ok(None) => {
                    debug!(url, strategy = strategy.name(), "No text, trying next strategy");
                }
                Err(e) if i < last => {
                    warn!(url, strategy = strategy.name(), error = %e, "Extraction failed, falling back");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }
}
