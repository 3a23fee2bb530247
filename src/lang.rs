//! English-language filtering.
//!
//! The processor rejects non-English pages before spending any parsing work
//! on them. Detection combines three cheap signals: the `lang` attribute in
//! the document head, the URL's country TLD, and a statistical look at a
//! sample of the visible text (non-ASCII letter ratio and English
//! function-word density).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::{floor_char_boundary, static_regex};

static LANG_ATTR: Lazy<Regex> =
    Lazy::new(|| static_regex(r#"(?i)<html[^>]*\blang\s*=\s*["']?([a-zA-Z-]{2,})"#));

static TAG: Lazy<Regex> = Lazy::new(|| static_regex(r"(?s)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<[^>]+>"));

/// Country TLDs that overwhelmingly host non-English content.
const NON_ENGLISH_TLDS: &[&str] = &[
    ".jp", ".cn", ".kr", ".ru", ".de", ".fr", ".es", ".it", ".pl", ".nl", ".se", ".no", ".fi",
    ".tr", ".br", ".mx", ".ar", ".th", ".vn", ".id", ".tw", ".gr", ".cz", ".hu", ".ro",
];

/// High-frequency English function words used as a density signal.
const FUNCTION_WORDS: &[&str] = &[
    "the", "and", "for", "that", "with", "this", "from", "have", "are", "was", "were", "not",
    "but", "you", "all", "can", "will", "one", "about", "which", "their", "has", "more", "when",
    "there", "what", "your", "how", "its", "into",
];

/// Number of content characters sampled for the statistical checks.
const SAMPLE_LEN: usize = 4_000;

/// Decides whether a raw HTML page is English.
///
/// The declared `lang` attribute wins when present. Otherwise the URL TLD
/// and a text sample are consulted; ambiguous pages are accepted so the
/// downstream quality gates make the final call.
#[must_use]
pub fn is_english(html: &str, url: &str) -> bool {
    // Declared language is the strongest signal.
    let head = &html[..floor_char_boundary(html, 4_096)];
    if let Some(caps) = LANG_ATTR.captures(head)
        && let Some(lang) = caps.get(1)
    {
        let lang = lang.as_str().to_lowercase();
        return lang == "en" || lang.starts_with("en-");
    }

    let sample = visible_sample(html);
    if sample_is_non_english(&sample) {
        return false;
    }

    // A non-English country TLD needs positive evidence from the text.
    if has_non_english_tld(url) {
        return function_word_ratio(&sample) >= 0.02;
    }

    true
}

fn has_non_english_tld(url: &str) -> bool {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("");
    let host = host.split(':').next().unwrap_or(host);
    NON_ENGLISH_TLDS.iter().any(|tld| host.ends_with(tld))
}

/// Strips tags and returns a bounded sample of visible text.
fn visible_sample(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    let mut sample = String::with_capacity(SAMPLE_LEN);
    for word in text.split_whitespace() {
        if sample.len() + word.len() + 1 > SAMPLE_LEN {
            break;
        }
        if !sample.is_empty() {
            sample.push(' ');
        }
        sample.push_str(word);
    }
    sample
}

fn sample_is_non_english(sample: &str) -> bool {
    let letters: Vec<char> = sample.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 40 {
        // Too little text to judge; let later gates decide.
        return false;
    }

    // Only a clearly non-Latin sample is rejected; ASCII junk falls
    // through to the content-quality gates.
    let non_ascii = letters.iter().filter(|c| !c.is_ascii()).count();
    #[allow(clippy::cast_precision_loss)]
    let non_ascii_ratio = non_ascii as f32 / letters.len() as f32;
    non_ascii_ratio > 0.3
}

fn function_word_ratio(sample: &str) -> f32 {
    let words: Vec<String> = sample
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let hits = words
        .iter()
        .filter(|w| FUNCTION_WORDS.contains(&w.as_str()))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = hits as f32 / words.len() as f32;
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_english_accepted() {
        let html = r#"<html lang="en"><body>whatever</body></html>"#;
        assert!(is_english(html, "https://example.com/x"));
    }

    #[test]
    fn test_declared_japanese_rejected() {
        let html = format!(
            r#"<html lang="ja"><body>{}</body></html>"#,
            "日本語 ".repeat(200)
        );
        assert!(!is_english(&html, "https://ex.com/x"));
    }

    #[test]
    fn test_cjk_content_without_lang_attr_rejected() {
        let html = format!("<html><body><p>{}</p></body></html>", "汉语内容 ".repeat(100));
        assert!(!is_english(&html, "https://example.com/x"));
    }

    #[test]
    fn test_english_prose_accepted() {
        let body = "The quick brown fox jumps over the lazy dog and then runs \
                    away into the forest where all the other animals have \
                    gathered for their annual meeting about the state of things. "
            .repeat(5);
        let html = format!("<html><body><p>{body}</p></body></html>");
        assert!(is_english(&html, "https://example.com/story"));
    }

    #[test]
    fn test_non_english_tld_needs_text_evidence() {
        // German TLD with too little English density.
        let body = "Dies ist ein langer deutscher Beispieltext ohne englische \
                    Wörter der nur zur Prüfung dient und weiter geht und geht. "
            .repeat(5);
        let html = format!("<html><body><p>{body}</p></body></html>");
        assert!(!is_english(&html, "https://beispiel.de/artikel"));

        // Same TLD but clearly English text is allowed through.
        let body = "This is the kind of page that happens to live on a country \
                    domain but is written in English for all of its readers. "
            .repeat(5);
        let html = format!("<html><body><p>{body}</p></body></html>");
        assert!(is_english(&html, "https://beispiel.de/artikel"));
    }

    #[test]
    fn test_tiny_sample_accepted() {
        // Not enough text to judge; downstream length gates reject it anyway.
        let html = "<html><body><p>short</p></body></html>";
        assert!(is_english(html, "https://example.com/x"));
    }

    #[test]
    fn test_script_and_style_ignored() {
        let html = format!(
            "<html><body><script>{}</script><p>{}</p></body></html>",
            "var x = 1;".repeat(100),
            "The article text is here and the words flow as expected for a \
             normal English page with all of the usual function words in it. "
                .repeat(4)
        );
        assert!(is_english(&html, "https://example.com/x"));
    }
}
