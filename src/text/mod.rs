//! Text cleaning and keyword extraction.
//!
//! This module operates on strings only; everything DOM-shaped lives in
//! [`crate::extract`]. The cleaner normalizes crawled text, the preview
//! selector picks a representative description, and the keyword extractor
//! ranks content terms against a cached stop-word set.

mod clean;
mod keywords;

pub use clean::{clean_text, create_description, format_headings_for_index};
pub use keywords::{
    combine_keywords, entity_keywords, extract_keywords, topic_keywords, CATEGORY_KEYWORDS,
};

use regex::Regex;

/// Compiles a pattern that is a compile-time constant of this crate.
#[allow(clippy::expect_used)]
pub(crate) fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

/// Returns the largest char boundary at or below `pos`.
#[must_use]
pub(crate) fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Splits text into sentences using Unicode sentence bounds.
#[must_use]
pub fn sentences(text: &str) -> Vec<&str> {
    use unicode_segmentation::UnicodeSegmentation;
    text.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
