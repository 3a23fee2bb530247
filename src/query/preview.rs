//! Query-aware preview selection.
//!
//! Each sentence of the chunk text is scored by query-term hits; the best
//! sentence becomes the preview, truncated at a word boundary when it
//! exceeds the budget. Without a usable sentence the preview falls back
//! to the leading characters.

use crate::text::{floor_char_boundary, sentences};

/// Default preview budget in characters.
pub const DEFAULT_PREVIEW_LENGTH: usize = 300;

/// Minimum sentence length considered for the preview.
const MIN_SENTENCE_CHARS: usize = 20;

/// Chooses a representative excerpt of `content` for `query`.
#[must_use]
pub fn smart_preview(content: &str, query: &str, max_length: usize) -> String {
    if content.is_empty() || max_length == 0 {
        return String::new();
    }
    if query.trim().is_empty() {
        return leading(content, max_length);
    }

    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut best: Option<(&str, usize)> = None;
    for sentence in sentences(content) {
        if sentence.len() < MIN_SENTENCE_CHARS {
            continue;
        }
        let lower = sentence.to_lowercase();
        let score = terms.iter().filter(|term| lower.contains(*term)).count();
        if score > 0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((sentence, score));
        }
    }

    match best {
        Some((sentence, _)) if sentence.len() <= max_length => sentence.to_string(),
        Some((sentence, _)) => truncate_words(sentence, max_length),
        None => leading(content, max_length),
    }
}

/// Truncates at the last word boundary inside the budget.
fn truncate_words(text: &str, max_length: usize) -> String {
    let budget = max_length.saturating_sub(3);
    let cut = floor_char_boundary(text, budget);
    let truncated = &text[..cut];
    truncated.rfind(' ').map_or_else(
        || format!("{truncated}..."),
        |space| format!("{}...", &truncated[..space]),
    )
}

fn leading(content: &str, max_length: usize) -> String {
    if content.len() <= max_length {
        return content.to_string();
    }
    let cut = floor_char_boundary(content, max_length);
    format!("{}...", &content[..cut])
}
