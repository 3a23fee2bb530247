//! Text cleaning pipeline and preview selection.
//!
//! Cleaning runs in a fixed order: HTML-entity decoding, repetition
//! collapse, navigation/boilerplate stripping, social-artifact removal,
//! whitespace normalization. Paragraph breaks (blank lines) survive
//! normalization so the preview selector and paragraph chunker can still
//! see document structure.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::{floor_char_boundary, static_regex};
use crate::model::TocEntry;

static HTML_ENTITY: Lazy<Regex> = Lazy::new(|| static_regex(r"&[a-zA-Z0-9#]+;"));
static EXCESSIVE_PUNCT: Lazy<Regex> = Lazy::new(|| static_regex(r"[.!?]{3,}"));
static NAV_WORDS: Lazy<Regex> = Lazy::new(|| {
    static_regex(r"(?i)\b(home|menu|navigation|footer|header|sidebar|breadcrumb)\b")
});
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    static_regex(r"(?i)\b(click here|read more|continue reading|share this|follow us)\b")
});
static SOCIAL: Lazy<Regex> = Lazy::new(|| {
    static_regex(r"(?i)\b(facebook|twitter|linkedin|instagram|share on|like us|follow us)\b")
});
static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| static_regex(r"[ \t\r\f]+"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| static_regex(r"\n{3,}"));

/// Named HTML entities decoded before the generic strip.
const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&#39;", "'"),
    ("&#8217;", "'"),
    ("&#8220;", "\""),
    ("&#8221;", "\""),
    ("&#8211;", "-"),
    ("&#8212;", "-"),
];

/// Runs the full cleaning pipeline over extracted text.
#[must_use]
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = decode_entities(text);
    let text = collapse_repetitions(&text);
    let text = strip_navigation_lines(&text);
    let text = SOCIAL.replace_all(&text, " ");
    normalize_whitespace(&text)
}

fn decode_entities(text: &str) -> String {
    let mut out = text.to_string();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    HTML_ENTITY.replace_all(&out, " ").into_owned()
}

/// Collapses runs of repeated words and consecutive duplicate lines.
fn collapse_repetitions(text: &str) -> String {
    let text = EXCESSIVE_PUNCT.replace_all(text, "...");

    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        // Drop a line repeating the previous one (menus render this way).
        if lines.last().is_some_and(|prev| *prev == line.trim()) && !line.trim().is_empty() {
            continue;
        }
        lines.push(line.trim());
    }

    let mut out = String::with_capacity(text.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&collapse_repeated_words(line));
    }
    out
}

/// Keeps at most two consecutive occurrences of the same word.
fn collapse_repeated_words(line: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut run = 0usize;
    let mut prev: Option<&str> = None;

    for word in line.split(' ') {
        if prev.is_some_and(|p| p.eq_ignore_ascii_case(word)) {
            run += 1;
        } else {
            run = 0;
        }
        if run < 2 {
            kept.push(word);
        }
        prev = Some(word);
    }
    kept.join(" ")
}

/// Line-level boilerplate heuristics.
///
/// A line is dropped when it is dominated by navigation tokens, when more
/// than 60% of its words are numeric, when more than 40% of its words
/// repeat, or when it is short with a low alphabetic ratio.
fn strip_navigation_lines(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            kept.push(line);
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();

        if words.len() <= 3 && NAV_WORDS.is_match(line) {
            continue;
        }
        if BOILERPLATE.is_match(line) && words.len() <= 8 {
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let numeric_ratio = words
            .iter()
            .filter(|w| w.chars().all(|c| c.is_ascii_digit() || c.is_ascii_punctuation()))
            .count() as f32
            / words.len().max(1) as f32;
        if numeric_ratio > 0.6 {
            continue;
        }

        // Repetition check targets short menu-like lines; long prose lines
        // repeat function words naturally.
        if (5..=30).contains(&words.len()) {
            let unique: std::collections::HashSet<String> =
                words.iter().map(|w| w.to_lowercase()).collect();
            #[allow(clippy::cast_precision_loss)]
            let repeat_ratio = 1.0 - unique.len() as f32 / words.len() as f32;
            if repeat_ratio > 0.4 {
                continue;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let alpha_ratio =
            line.chars().filter(|c| c.is_alphabetic()).count() as f32 / line.len() as f32;
        if line.len() < 50 && alpha_ratio < 0.5 {
            continue;
        }

        kept.push(line);
    }

    kept.join("\n")
}

/// Collapses horizontal whitespace while preserving paragraph breaks.
fn normalize_whitespace(text: &str) -> String {
    let text = HORIZONTAL_WS.replace_all(text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Picks a representative description from cleaned content.
///
/// Paragraphs are scored by vocabulary diversity, proper-noun presence,
/// and sentence structure, with penalties for UI text; the winner is
/// truncated at a sentence boundary when one falls inside 70% of the
/// budget, else at a word boundary.
#[must_use]
pub fn create_description(content: &str, max_length: usize) -> String {
    if content.is_empty() || max_length == 0 {
        return String::new();
    }

    let paragraphs: Vec<&str> = content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut best: Option<(&str, i64)> = None;
    for paragraph in &paragraphs {
        if paragraph.len() < 50 {
            continue;
        }
        let score = score_paragraph(paragraph);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((paragraph, score));
        }
    }

    let chosen = best
        .map(|(p, _)| p)
        .or_else(|| paragraphs.first().copied())
        .unwrap_or("");

    truncate_description(chosen, max_length)
}

fn score_paragraph(paragraph: &str) -> i64 {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    let unique: std::collections::HashSet<String> =
        words.iter().map(|w| w.to_lowercase()).collect();

    let mut score = unique.len() as i64 * 2;
    if paragraph.chars().any(char::is_uppercase) {
        score += 5;
    }
    if paragraph.contains('.') {
        score += 3;
    }
    let lower = paragraph.to_lowercase();
    score -= lower.matches("click").count() as i64 * 10;
    score -= lower.matches("cookie").count() as i64 * 5;
    score
}

fn truncate_description(paragraph: &str, max_length: usize) -> String {
    if paragraph.len() <= max_length {
        return paragraph.to_string();
    }

    let cut = floor_char_boundary(paragraph, max_length);
    let truncated = &paragraph[..cut];

    let sentence_end = truncated
        .rfind('.')
        .max(truncated.rfind('!'))
        .max(truncated.rfind('?'));
    if let Some(end) = sentence_end
        && end + 1 > max_length * 7 / 10
    {
        return truncated[..=end].to_string();
    }

    truncated.rfind(' ').map_or_else(
        || format!("{truncated}..."),
        |space| format!("{}...", &truncated[..space]),
    )
}

/// Formats headings for the chunk index field.
///
/// Output is a JSON array of `{level, text}` pairs, each text truncated to
/// 200 characters, the array truncated to 10 entries. Returns `"[]"` when
/// there is nothing to format.
#[must_use]
pub fn format_headings_for_index(headings: &[TocEntry]) -> String {
    if headings.is_empty() {
        return "[]".to_string();
    }

    let formatted: Vec<serde_json::Value> = headings
        .iter()
        .take(10)
        .map(|heading| {
            let text = heading.text.trim();
            let text = if text.len() > 200 {
                let cut = floor_char_boundary(text, 197);
                format!("{}...", &text[..cut])
            } else {
                text.to_string()
            };
            json!({ "level": heading.level, "text": text })
        })
        .collect();

    serde_json::to_string(&formatted).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, text: &str) -> TocEntry {
        TocEntry {
            level,
            text: text.to_string(),
            anchor: None,
        }
    }

    #[test]
    fn test_clean_text_decodes_entities() {
        let cleaned = clean_text("Fish &amp; chips &#8211; the best &nbsp; meal");
        assert!(cleaned.contains("Fish & chips - the best meal"));
    }

    #[test]
    fn test_clean_text_strips_unknown_entities() {
        let cleaned = clean_text("before &copy; after");
        assert!(!cleaned.contains("&copy;"));
        assert!(cleaned.contains("before"));
        assert!(cleaned.contains("after"));
    }

    #[test]
    fn test_clean_text_drops_nav_lines() {
        let text = "Home Menu\nThe actual article content goes on for quite a \
                    while and explains something useful to readers.\nFooter";
        let cleaned = clean_text(text);
        assert!(!cleaned.contains("Home Menu"));
        assert!(!cleaned.contains("Footer"));
        assert!(cleaned.contains("actual article content"));
    }

    #[test]
    fn test_clean_text_drops_numeric_lines() {
        let text = "12 34 56 78 90 11\nReal sentence content that survives the \
                    numeric filter because it is made of words.";
        let cleaned = clean_text(text);
        assert!(!cleaned.contains("12 34 56"));
        assert!(cleaned.contains("Real sentence content"));
    }

    #[test]
    fn test_clean_text_drops_repeated_word_lines() {
        let text = "buy now buy now buy now buy now buy now\nGenuine prose with \
                    enough distinct words to stay in the output text.";
        let cleaned = clean_text(text);
        assert!(!cleaned.contains("buy now buy now"));
        assert!(cleaned.contains("Genuine prose"));
    }

    #[test]
    fn test_clean_text_collapses_duplicate_lines() {
        let text = "Subscribe to our newsletter today please\nSubscribe to our newsletter today please\nSubscribe to our newsletter today please\nBody text.";
        let cleaned = clean_text(text);
        assert_eq!(cleaned.matches("Subscribe to our newsletter").count(), 1);
    }

    #[test]
    fn test_clean_text_preserves_paragraph_breaks() {
        let text = "First paragraph with plenty of ordinary words in it for the filters.\n\n\n\nSecond paragraph also with plenty of ordinary words in it.";
        let cleaned = clean_text(text);
        assert!(cleaned.contains("\n\n"));
        assert!(!cleaned.contains("\n\n\n"));
    }

    #[test]
    fn test_clean_text_excessive_punctuation() {
        let cleaned = clean_text("Wait for it!!!!! Something happened here today truly.");
        assert!(cleaned.contains("..."));
        assert!(!cleaned.contains("!!!"));
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_description_picks_informative_paragraph() {
        let content = "Click here click here click here to subscribe now and win.\n\n\
                       Rust ownership rules guarantee memory safety without a garbage \
                       collector. The compiler enforces borrowing discipline at build time.";
        let description = create_description(content, 300);
        assert!(description.contains("ownership"));
        assert!(!description.contains("Click here"));
    }

    #[test]
    fn test_description_sentence_boundary_truncation() {
        let content = "This is the first sentence of a long paragraph about search \
                       engines. This second sentence pushes the text over the budget \
                       by a comfortable margin so truncation has to happen somewhere.";
        let description = create_description(content, 100);
        assert!(description.len() <= 103);
        assert!(description.ends_with('.') || description.ends_with("..."));
    }

    #[test]
    fn test_description_short_content_kept_whole() {
        let content = "A tidy single paragraph that fits inside the budget easily.";
        assert_eq!(create_description(content, 300), content);
    }

    #[test]
    fn test_description_empty() {
        assert_eq!(create_description("", 300), "");
    }

    #[test]
    fn test_format_headings_empty() {
        assert_eq!(format_headings_for_index(&[]), "[]");
    }

    #[test]
    fn test_format_headings_truncates_long_text() {
        let long = "H".repeat(400);
        let formatted = format_headings_for_index(&[heading(2, &long)]);
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&formatted).unwrap();
        let text = parsed[0]["text"].as_str().unwrap();
        assert!(text.len() <= 200);
        assert!(text.ends_with("..."));
        assert_eq!(parsed[0]["level"], 2);
    }

    #[test]
    fn test_format_headings_caps_entries() {
        let many: Vec<TocEntry> = (0..15).map(|i| heading(1, &format!("Section {i}"))).collect();
        let formatted = format_headings_for_index(&many);
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed.len(), 10);
    }

    #[test]
    fn test_collapse_repeated_words() {
        assert_eq!(
            collapse_repeated_words("go go go go stop"),
            "go go stop"
        );
        assert_eq!(collapse_repeated_words("one two three"), "one two three");
    }
}
