//! Keyword extraction and merging.
//!
//! Generated keywords come from frequency analysis over a cached stop-word
//! set, with length and technical-term bonuses. Author-declared keywords
//! always rank first and keep their original casing.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use super::static_regex;

static WORD: Lazy<Regex> = Lazy::new(|| static_regex(r"[a-zA-Z]{4,}"));

/// Category vocabulary and the keyword set counted for each label.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "technical",
        &[
            "api", "code", "function", "class", "method", "algorithm", "software", "programming",
            "database", "server", "framework",
        ],
    ),
    (
        "educational",
        &[
            "tutorial", "guide", "how-to", "learn", "course", "lesson", "example", "introduction",
            "basics",
        ],
    ),
    (
        "documentation",
        &["documentation", "docs", "reference", "manual", "specification", "changelog"],
    ),
    ("qa", &["question", "answer", "ask", "solve", "faq", "troubleshoot"]),
    (
        "news",
        &["news", "breaking", "report", "announced", "announcement", "release"],
    ),
    ("blog", &["blog", "article", "post", "opinion", "thoughts"]),
    (
        "academic",
        &["research", "study", "paper", "abstract", "journal", "thesis", "citation"],
    ),
];

/// Substrings that mark a token as a domain/technical term.
const TECH_SUBSTRINGS: &[&str] = &[
    "tech", "data", "code", "program", "algorithm", "system", "network", "software", "hardware",
    "computer", "crypto", "kernel",
];

/// Tokens that score well on frequency but carry no topical signal.
const LOW_SIGNAL: &[&str] = &[
    "said", "says", "like", "just", "back", "part", "time", "year", "years", "people", "things",
    "thing",
];

/// Junk tokens produced by markup that leaks through cleaning.
const MARKUP_JUNK: &[&str] = &[
    "www", "http", "https", "html", "nbsp", "quot", "amp", "mdash", "ndash", "hellip",
];

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Articles, prepositions, conjunctions
        "the", "and", "for", "that", "with", "this", "from", "into", "through", "during",
        "before", "after", "above", "below", "between", "among", "about", "against", "under",
        "over", "because", "since", "unless", "until", "while", "whereas", "although", "though",
        // Verbs of being and auxiliaries
        "have", "has", "had", "does", "did", "will", "would", "could", "should", "might", "must",
        "been", "being", "were", "was", "are",
        // Pronouns and question words
        "what", "where", "when", "which", "whose", "whom", "they", "them", "their", "theirs",
        "your", "yours", "ours", "hers", "his", "its", "this", "that", "these", "those", "there",
        "here", "other", "another", "some", "any", "every", "each", "both", "either", "neither",
        // Common verbs
        "make", "take", "give", "know", "think", "come", "want", "look", "find", "tell", "work",
        "seem", "feel", "leave", "mean", "keep", "begin", "help", "talk", "turn", "start", "show",
        "hear", "play", "move", "live", "believe", "hold", "bring", "happen", "write", "provide",
        "stand", "lose", "meet", "include", "continue", "learn", "change", "lead", "understand",
        "watch", "follow", "stop", "create", "speak", "read", "allow", "spend", "grow", "open",
        "walk", "offer", "remember", "love", "consider", "appear", "wait", "serve", "send",
        "expect", "build", "stay", "fall", "reach", "remain", "suggest",
        // Web and UI vocabulary
        "click", "here", "link", "page", "site", "website", "home", "menu", "navigation",
        "footer", "header", "sidebar", "breadcrumb", "search", "login", "register", "submit",
        "form", "button", "back", "next", "more", "less", "none", "contact", "privacy", "terms",
        "copyright", "share", "like", "follow", "subscribe", "newsletter", "email", "download",
        "upload", "file", "image", "video", "audio", "view", "edit", "delete", "save", "cancel",
        // Fillers and quantifiers
        "very", "really", "quite", "rather", "just", "only", "even", "still", "also", "then",
        "now", "today", "yesterday", "tomorrow", "always", "never", "sometimes", "often",
        "usually", "already", "again", "once", "twice", "first", "second", "third", "last",
        "previous", "same", "different", "good", "best", "better", "much", "many", "little",
        "most", "least", "such", "said", "well", "used", "using", "user", "users", "within",
        "without", "whether", "however", "thus",
        // Number words
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "hundred", "thousand", "million", "billion",
    ]
    .into_iter()
    .collect()
});

/// Extracts ranked keywords from cleaned content.
///
/// Tokens are alphabetic, at least four characters, and filtered against
/// the stop-word set. Ranking is frequency times a length bonus times a
/// technical-term bonus, with a quality floor at 30% of the best score.
#[must_use]
pub fn extract_keywords(content: &str, max_keywords: usize) -> Vec<String> {
    if content.is_empty() || max_keywords == 0 {
        return Vec::new();
    }

    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for token in WORD.find_iter(content) {
        let word = token.as_str().to_lowercase();
        if !is_candidate(&word) {
            continue;
        }
        *frequencies.entry(word).or_insert(0) += 1;
    }

    if frequencies.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(String, f32)> = frequencies
        .into_iter()
        .map(|(word, freq)| {
            let score = score_word(&word, freq);
            (word, score)
        })
        .collect();

    let best = scored.iter().map(|(_, s)| *s).fold(0.0f32, f32::max);
    let floor = (best * 0.3).max(1.0);
    scored.retain(|(_, score)| *score >= floor);

    // Stable ordering: score descending, then alphabetical.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    scored
        .into_iter()
        .take(max_keywords)
        .map(|(word, _)| word)
        .collect()
}

fn is_candidate(word: &str) -> bool {
    if word.len() < 4 || STOP_WORDS.contains(word) || MARKUP_JUNK.contains(&word) {
        return false;
    }
    // Short inflected forms are usually noise; longer ones carry meaning.
    let suffixed = ["ing", "est"].iter().any(|s| word.ends_with(s));
    !(suffixed && word.len() < 6)
}

#[allow(clippy::cast_precision_loss)]
fn score_word(word: &str, freq: usize) -> f32 {
    let mut score = freq as f32;

    score *= match word.len() {
        0..=4 => 1.1,
        5 => 1.4,
        6 | 7 => 1.8,
        _ => 2.0,
    };

    if TECH_SUBSTRINGS.iter().any(|t| word.contains(t)) {
        score *= 1.3;
    }
    if LOW_SIGNAL.contains(&word) {
        score *= 0.5;
    }

    score
}

/// Extracts named-entity keywords from capitalized word runs.
///
/// A lightweight stand-in for a real NER pass: consecutive capitalized
/// words not at sentence start are treated as entity names (people,
/// organizations, products). Single capitalized stop words never qualify.
#[must_use]
pub fn entity_keywords(content: &str, max_entities: usize) -> Vec<String> {
    if content.is_empty() || max_entities == 0 {
        return Vec::new();
    }

    let mut entities: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let words: Vec<&str> = content.split_whitespace().collect();
    let mut run: Vec<&str> = Vec::new();
    let mut run_starts_sentence = true;

    let mut sentence_start = true;
    for word in &words {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        let capitalized = trimmed.chars().next().is_some_and(char::is_uppercase)
            && trimmed.chars().skip(1).any(char::is_lowercase);

        if capitalized {
            if run.is_empty() {
                run_starts_sentence = sentence_start;
            }
            run.push(trimmed);
        } else {
            flush_entity_run(&mut run, run_starts_sentence, &mut entities, &mut seen);
        }

        sentence_start = word.ends_with(['.', '!', '?', ':']);
        if entities.len() >= max_entities {
            return entities;
        }
    }
    flush_entity_run(&mut run, run_starts_sentence, &mut entities, &mut seen);

    entities.truncate(max_entities);
    entities
}

/// Accepts a finished capitalized run as an entity when it qualifies.
fn flush_entity_run(
    run: &mut Vec<&str>,
    starts_sentence: bool,
    entities: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    if run.is_empty() {
        return;
    }
    let candidate = run.join(" ");
    run.clear();

    // A lone capitalized word at sentence start is ordinary prose, and a
    // lone stop word ("The", "This") is never an entity.
    let word_count = candidate.split(' ').count();
    if word_count == 1 && (starts_sentence || STOP_WORDS.contains(candidate.to_lowercase().as_str()))
    {
        return;
    }
    if candidate.len() < 3 || candidate.len() > 60 {
        return;
    }
    if seen.insert(candidate.to_lowercase()) {
        entities.push(candidate);
    }
}

/// Returns category-dictionary terms present in the content.
#[must_use]
pub fn topic_keywords(content: &str) -> Vec<String> {
    let lower = content.to_lowercase();
    let mut hits: Vec<String> = Vec::new();
    for (_, words) in CATEGORY_KEYWORDS {
        for word in *words {
            if hits.len() >= 5 {
                return hits;
            }
            if lower.contains(word) && !hits.iter().any(|h| h == word) {
                hits.push((*word).to_string());
            }
        }
    }
    hits
}

/// Merges author-declared keywords with generated ones.
///
/// Author keywords come first with their original casing; duplicates are
/// removed case-insensitively; the result is capped at `max_keywords`.
#[must_use]
pub fn combine_keywords(
    original: &[String],
    generated: &[String],
    max_keywords: usize,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut combined: Vec<String> = Vec::new();

    for keyword in original.iter().chain(generated.iter()) {
        if combined.len() >= max_keywords {
            break;
        }
        let cleaned = keyword.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if cleaned.is_empty() || cleaned.len() > 60 {
            continue;
        }
        if seen.insert(cleaned.to_lowercase()) {
            combined.push(cleaned.to_string());
        }
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords_basic() {
        let content = "Rust compiler performance. The Rust compiler optimizes \
                       aggressively. Rust compiler engineering is fascinating \
                       work and compiler output matters.";
        let keywords = extract_keywords(content, 5);
        assert!(keywords.contains(&"compiler".to_string()));
        assert!(keywords.contains(&"rust".to_string()));
    }

    #[test]
    fn test_extract_keywords_filters_stop_words() {
        let keywords = extract_keywords("the and that with this from have will", 10);
        assert!(keywords.is_empty());
    }

    #[test]
    fn test_extract_keywords_min_length() {
        let keywords = extract_keywords("api ox cat dog", 10);
        // All tokens are under four characters.
        assert!(keywords.is_empty());
    }

    #[test]
    fn test_extract_keywords_deterministic() {
        let content = "database indexing database searching database queries";
        assert_eq!(extract_keywords(content, 5), extract_keywords(content, 5));
    }

    #[test]
    fn test_extract_keywords_cap() {
        let content = "alpha bravo charlie delta echofox golfball hotelier \
                       indiagame juliette kilogram limabean mikewave";
        let keywords = extract_keywords(content, 3);
        assert!(keywords.len() <= 3);
    }

    #[test]
    fn test_extract_keywords_empty() {
        assert!(extract_keywords("", 10).is_empty());
        assert!(extract_keywords("some words here", 0).is_empty());
    }

    #[test]
    fn test_technical_terms_rank_higher() {
        let content = "wonderful database wonderful database wonderful database";
        let keywords = extract_keywords(content, 2);
        // Same frequency; "database" carries a technical bonus.
        assert_eq!(keywords.first().map(String::as_str), Some("database"));
    }

    #[test]
    fn test_entity_keywords_multiword() {
        let content = "The team at Mozilla Firefox shipped a release while \
                       Apache Lucene gained new features.";
        let entities = entity_keywords(content, 10);
        assert!(entities.contains(&"Mozilla Firefox".to_string()));
        assert!(entities.contains(&"Apache Lucene".to_string()));
    }

    #[test]
    fn test_entity_keywords_skips_sentence_starts() {
        let content = "Everything here starts plainly. Nothing looks like a name.";
        let entities = entity_keywords(content, 10);
        assert!(entities.is_empty());
    }

    #[test]
    fn test_entity_keywords_mid_sentence_single_word() {
        let content = "The index is rebuilt by Lucene every night without fail.";
        let entities = entity_keywords(content, 10);
        assert_eq!(entities, vec!["Lucene".to_string()]);
    }

    #[test]
    fn test_entity_keywords_dedup_and_cap() {
        let content = "We met Grace Hopper and later Grace Hopper again, plus \
                       Alan Turing and Ada Lovelace at the event.";
        let entities = entity_keywords(content, 2);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0], "Grace Hopper");
    }

    #[test]
    fn test_entity_keywords_empty() {
        assert!(entity_keywords("", 5).is_empty());
        assert!(entity_keywords("Some Words Here", 0).is_empty());
    }

    #[test]
    fn test_topic_keywords() {
        let content = "This tutorial is a guide to the documentation of our api.";
        let topics = topic_keywords(content);
        assert!(topics.contains(&"tutorial".to_string()));
        assert!(topics.contains(&"api".to_string()));
        assert!(topics.len() <= 5);
    }

    #[test]
    fn test_topic_keywords_none() {
        assert!(topic_keywords("nothing relevant in here whatsoever").is_empty());
    }

    #[test]
    fn test_combine_keywords_author_first_case_preserved() {
        let original = vec!["Rust".to_string(), "WebAssembly".to_string()];
        let generated = vec!["rust".to_string(), "compiler".to_string()];
        let combined = combine_keywords(&original, &generated, 10);
        assert_eq!(combined[0], "Rust");
        assert_eq!(combined[1], "WebAssembly");
        // Case-insensitive duplicate of "Rust" was dropped.
        assert!(!combined.contains(&"rust".to_string()));
        assert!(combined.contains(&"compiler".to_string()));
    }

    #[test]
    fn test_combine_keywords_cap() {
        let original: Vec<String> = (0..8).map(|i| format!("orig{i}")).collect();
        let generated: Vec<String> = (0..8).map(|i| format!("gen{i}")).collect();
        let combined = combine_keywords(&original, &generated, 10);
        assert_eq!(combined.len(), 10);
        assert_eq!(combined[0], "orig0");
        assert_eq!(combined[9], "gen1");
    }

    #[test]
    fn test_combine_keywords_strips_quotes() {
        let original = vec!["\"quoted\"".to_string(), "  spaced  ".to_string()];
        let combined = combine_keywords(&original, &[], 10);
        assert_eq!(combined, vec!["quoted".to_string(), "spaced".to_string()]);
    }
}
