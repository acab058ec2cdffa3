// Which discovered links a task follows, and under what identity they are recorded.

use pagewatch_common::CrawlConfig;
use regex::Regex;
use url::Url;

/// Query parameter boards append to permalink a single comment.
pub const COMMENT_PARAM: &str = "comment_srl";

/// True when both URLs share the same host and port. Unparseable input is never same-domain.
pub fn is_same_domain(base_url: &str, target_url: &str) -> bool {
    let (Ok(base), Ok(target)) = (Url::parse(base_url), Url::parse(target_url)) else {
        return false;
    };
    match (base.host_str(), target.host_str()) {
        (Some(a), Some(b)) => a == b && base.port() == target.port(),
        _ => false,
    }
}

/// URL of listing page `page` (1-based).
///
/// Page 1 is the task URL untouched. Later pages set `param` to the page
/// number, replacing an existing value and keeping every other query pair,
/// the path, and the fragment.
pub fn paged_url(url: &str, page: u32, param: &str) -> Result<String, url::ParseError> {
    if page <= 1 {
        return Ok(url.to_string());
    }

    let mut parsed = Url::parse(url)?;
    let page_value = page.to_string();

    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut replaced = false;
    for (k, v) in parsed.query_pairs() {
        if k == param {
            if !replaced {
                pairs.push((k.into_owned(), page_value.clone()));
                replaced = true;
            }
        } else {
            pairs.push((k.into_owned(), v.into_owned()));
        }
    }
    if !replaced {
        pairs.push((param.to_string(), page_value));
    }

    parsed.query_pairs_mut().clear().extend_pairs(&pairs);
    Ok(parsed.to_string())
}

/// Identity under which a detail link is recorded: the comment parameter and
/// any fragment are dropped so comment permalinks collapse onto their post.
///
/// The query is always re-serialized from its decoded pairs, so equivalent
/// encodings (`%20` and `+`, raw and escaped `/`) end up as one string.
/// Idempotent.
pub fn normalize_detail_url(url: &str) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(url)?;
    parsed.set_fragment(None);

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != COMMENT_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(&kept);
    }

    Ok(parsed.to_string())
}

/// Path-based allow/deny rules. Deny wins; with no allow rule everything else passes.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    allow: Option<Regex>,
    deny: Option<Regex>,
}

impl LinkFilter {
    pub fn new(allow: Option<Regex>, deny: Option<Regex>) -> Self {
        Self { allow, deny }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            config.allow_path_pattern.clone(),
            config.deny_path_pattern.clone(),
        )
    }

    pub fn allows(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let path = parsed.path();

        if let Some(deny) = &self.deny {
            if deny.is_match(path) {
                return false;
            }
        }
        match &self.allow {
            Some(allow) => allow.is_match(path),
            None => true,
        }
    }
}
