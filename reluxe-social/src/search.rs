//! Search suggestion rendering. Suggestions come back from the backend as
//! plain strings; they are escaped before any HTML is built around them, so
//! a hostile suggestion cannot smuggle markup into the dropdown.

use std::sync::Arc;

use reluxe_shared::errors::AppResult;

use crate::follow::SocialApi;

/// Fetch suggestions for a typed keyword and render each with the matched
/// fragment bolded.
pub async fn guide_keyword(
    api: Arc<dyn SocialApi>,
    keyword: &str,
) -> AppResult<Vec<String>> {
    let suggestions = api.guide_keyword(keyword).await?;
    Ok(suggestions
        .iter()
        .map(|suggestion| highlight(suggestion, keyword))
        .collect())
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape `suggestion` and wrap case-insensitive matches of `keyword` in
/// `<b>` tags. Matching is byte-offset based, so non-ASCII input (where
/// case folding can shift offsets) is escaped without highlighting.
pub fn highlight(suggestion: &str, keyword: &str) -> String {
    if keyword.is_empty() || !suggestion.is_ascii() || !keyword.is_ascii() {
        return escape_html(suggestion);
    }

    let haystack = suggestion.to_ascii_lowercase();
    let needle = keyword.to_ascii_lowercase();

    let mut out = String::new();
    let mut cursor = 0;
    while let Some(found) = haystack[cursor..].find(&needle) {
        let start = cursor + found;
        let end = start + needle.len();
        out.push_str(&escape_html(&suggestion[cursor..start]));
        out.push_str("<b>");
        out.push_str(&escape_html(&suggestion[start..end]));
        out.push_str("</b>");
        cursor = end;
    }
    out.push_str(&escape_html(&suggestion[cursor..]));
    out
}
