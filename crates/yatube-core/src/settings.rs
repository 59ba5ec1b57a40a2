//! Site-wide constants.

use std::time::Duration;

/// Posts shown on one page of any listing.
pub const POSTS_PER_PAGE: usize = 10;

/// Size of the trailing partial page the pagination fixtures build.
pub const FIXTURE_TAIL_POSTS: usize = 3;

/// Characters kept when a post or comment is shown as a one-line summary.
pub const SUMMARY_LEN: usize = 15;

/// How long a rendered index page is served from the page cache.
pub const INDEX_CACHE_TTL: Duration = Duration::from_secs(20);

/// Key prefix of cached index pages.
pub const INDEX_CACHE_PREFIX: &str = "index_page";

/// Shorten `text` to at most [`SUMMARY_LEN`] characters.
pub fn summary(text: &str) -> &str {
    match text.char_indices().nth(SUMMARY_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_keeps_short_text() {
        assert_eq!(summary("short"), "short");
    }

    #[test]
    fn summary_counts_characters_not_bytes() {
        let text = "Тестовый пост для проверки";
        assert_eq!(summary(text), "Тестовый пост д");
        assert_eq!(summary(text).chars().count(), SUMMARY_LEN);
    }
}
