// Context snippets stored on alerts.

/// Characters of context kept on each side of the match position.
pub const CONTEXT_RADIUS: usize = 50;

/// Text around the first occurrence of `keyword` (exact, case-sensitive).
///
/// The window runs from `CONTEXT_RADIUS` characters before the match start to
/// `CONTEXT_RADIUS` characters after it, clipped to the text. Line breaks
/// become spaces and the result is trimmed.
pub fn context_snippet(text: &str, keyword: &str) -> Option<String> {
    let byte_idx = text.find(keyword)?;
    let idx = text[..byte_idx].chars().count();
    let start = idx.saturating_sub(CONTEXT_RADIUS);
    let len = idx + CONTEXT_RADIUS - start;

    let window: String = text
        .chars()
        .skip(start)
        .take(len)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    Some(window.trim().to_string())
}

/// Alert context for a match on the task's own page.
pub fn single_page_context(snippet: &str) -> String {
    format!("...{snippet}...")
}

/// Alert context for a match on a detail page; the link is recoverable
/// through `Alert::link`.
pub fn detail_context(link: &str, snippet: &str) -> String {
    format!("[{link}] ...{snippet}...")
}
