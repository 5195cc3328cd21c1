use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of characters kept after cleaning.
pub const MAX_CLEAN_CHARS: usize = 1000;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url pattern compiles"));
static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Normalizes tweet-like text before embedding.
///
/// Mention and hashtag sigils are dropped first so that removing them can
/// never assemble a new URL, then URLs are stripped, whitespace runs are
/// collapsed and the result is capped at [`MAX_CLEAN_CHARS`] characters.
/// Applying it twice gives the same result as applying it once.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_sigils: String = text.chars().filter(|c| *c != '@' && *c != '#').collect();
    let without_urls = URL_RE.replace_all(&without_sigils, "");
    let collapsed = SPACE_RE.replace_all(&without_urls, " ");
    let trimmed = collapsed.trim();

    match trimmed.char_indices().nth(MAX_CLEAN_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}
