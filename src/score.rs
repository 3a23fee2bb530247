//! Domain authority, content quality, and category scoring.
//!
//! Everything here is a pure function of its inputs plus static tables
//! loaded once per process, so scoring is safe to run from any number of
//! pipeline workers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::{static_regex, CATEGORY_KEYWORDS};

/// Score assigned to hosts absent from the authority table.
pub const UNKNOWN_DOMAIN_SCORE: f32 = 0.3;

/// Static domain-authority table. Entries starting with `.` are TLD
/// suffix patterns consulted after exact host matches.
static DOMAIN_SCORES: &[(&str, f32)] = &[
    // High authority domains
    ("wikipedia.org", 0.9),
    ("en.wikipedia.org", 0.9),
    ("github.com", 0.85),
    ("stackoverflow.com", 0.8),
    ("arxiv.org", 0.85),
    ("nature.com", 0.9),
    ("science.org", 0.9),
    ("pubmed.ncbi.nlm.nih.gov", 0.85),
    // News domains
    ("reuters.com", 0.8),
    ("bbc.com", 0.8),
    ("cnn.com", 0.7),
    ("npr.org", 0.75),
    // Tech press
    ("techcrunch.com", 0.7),
    ("arstechnica.com", 0.75),
    ("wired.com", 0.7),
    // Educational and government suffixes
    (".edu", 0.8),
    (".ac.uk", 0.8),
    (".gov", 0.75),
    (".mil", 0.7),
    // Generic TLD defaults
    (".org", 0.6),
    (".com", 0.5),
    (".net", 0.45),
    (".info", 0.4),
    (".biz", 0.35),
];

/// Factor weights for the quality score. They sum to 1.
const WEIGHTS: [(Factor, f32); 8] = [
    (Factor::Length, 0.20),
    (Factor::Structure, 0.20),
    (Factor::ContentType, 0.15),
    (Factor::Language, 0.10),
    (Factor::Metadata, 0.10),
    (Factor::Technical, 0.10),
    (Factor::Authoritativeness, 0.10),
    (Factor::Completeness, 0.05),
];

#[derive(Clone, Copy)]
enum Factor {
    Length,
    Structure,
    ContentType,
    Language,
    Metadata,
    Technical,
    Authoritativeness,
    Completeness,
}

static CITATION: Lazy<Regex> = Lazy::new(|| static_regex(r"\[\d{1,3}\]"));
static YEAR_REF: Lazy<Regex> = Lazy::new(|| static_regex(r"\((19|20)\d{2}\)"));
static SCHOLARLY_ID: Lazy<Regex> =
    Lazy::new(|| static_regex(r"(?i)\b(doi:|isbn[- ]?\d|arxiv:)"));

const EDUCATIONAL_STRONG: &[&str] = &[
    "tutorial", "guide", "documentation", "manual", "reference", "api", "how-to",
];
const EDUCATIONAL_MEDIUM: &[&str] = &[
    "example", "demo", "introduction", "overview", "basics", "fundamentals",
];
const EDUCATIONAL_WEAK: &[&str] = &["blog", "news", "announcement", "release"];

const QUALITY_POSITIVE: &[&str] = &["detailed", "comprehensive", "complete", "thorough", "in-depth"];
const QUALITY_NEGATIVE: &[&str] = &["broken", "outdated", "deprecated", "legacy"];

const PROG_LANGUAGES: &[&str] = &[
    "python", "javascript", "java", "c++", "c#", "php", "ruby", "golang", "rust", "swift",
    "kotlin", "typescript", "scala", "haskell", "clojure", "erlang", "elixir",
];
const TECH_TERMS: &[&str] = &[
    "api", "rest", "graphql", "database", "sql", "nosql", "mongodb", "redis", "docker",
    "kubernetes", "react", "angular", "algorithm", "optimization", "architecture", "framework",
    "middleware", "compiler",
];
const ADVANCED_CONCEPTS: &[&str] = &[
    "decorator", "metaclass", "coroutine", "async", "await", "closure", "lambda", "generator",
    "iterator", "inheritance", "polymorphism", "encapsulation", "abstraction", "concurrency",
    "microservice",
];

const CREDENTIAL_WORDS: &[&str] = &["professor", "ph.d", "phd", "dr.", "researcher"];
const INSTITUTION_WORDS: &[&str] = &["university", "institute", "laboratory", "college"];

const COVERAGE_WORDS: &[&str] = &["overview", "introduction", "conclusion", "summary", "example"];
const DEPTH_WORDS: &[&str] = &["detailed", "comprehensive", "in-depth", "thorough", "advanced"];

/// Content-shape metrics the extractor computes from the parsed page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentMetrics {
    /// Word count of the main content.
    pub word_count: usize,
    /// Average sentence length in words.
    pub avg_sentence_length: f32,
    /// Number of h1-h6 headings.
    pub heading_count: usize,
    /// Page contains `<pre>`/`<code>` blocks.
    pub has_code_blocks: bool,
    /// Page contains list markup.
    pub has_lists: bool,
    /// Page contains tables.
    pub has_tables: bool,
    /// Page uses semantic sectioning tags (article, section, main).
    pub has_semantic_tags: bool,
}

/// Metadata fields consulted by the quality score.
#[derive(Debug, Clone, Default)]
pub struct ScoringMetadata {
    /// Consolidated title.
    pub title: String,
    /// Chosen description.
    pub description: String,
    /// Whether an author was identified.
    pub has_author: bool,
    /// Whether a publication date was identified.
    pub has_date: bool,
}

/// Looks up the authority score of a URL's host.
///
/// Exact host matches win over TLD suffix matches; unknown hosts score
/// [`UNKNOWN_DOMAIN_SCORE`].
#[must_use]
pub fn domain_score(url: &str) -> f32 {
    let Ok(parsed) = url::Url::parse(url) else {
        return UNKNOWN_DOMAIN_SCORE;
    };
    let Some(host) = parsed.host_str() else {
        return UNKNOWN_DOMAIN_SCORE;
    };
    let host = host.strip_prefix("www.").unwrap_or(host).to_lowercase();

    for (pattern, score) in DOMAIN_SCORES {
        if !pattern.starts_with('.') && host == *pattern {
            return *score;
        }
    }
    for (pattern, score) in DOMAIN_SCORES {
        if pattern.starts_with('.') && host.ends_with(pattern) {
            return *score;
        }
    }

    UNKNOWN_DOMAIN_SCORE
}

/// Computes the weighted content-quality score.
///
/// Each factor lands in roughly [0, 2] and the weights sum to 1, keeping
/// the result bounded. The score is monotone in every factor.
#[must_use]
pub fn quality_score(content: &str, metadata: &ScoringMetadata, metrics: &ContentMetrics) -> f32 {
    if content.is_empty() {
        return 0.1;
    }
    let lower = content.to_lowercase();

    WEIGHTS
        .iter()
        .map(|(factor, weight)| {
            let value = match factor {
                Factor::Length => length_score(metrics.word_count),
                Factor::Structure => structure_score(metrics),
                Factor::ContentType => content_type_score(&lower, &metadata.title),
                Factor::Language => language_quality_score(content),
                Factor::Metadata => metadata_score(metadata),
                Factor::Technical => technical_bonus(&lower, content),
                Factor::Authoritativeness => authoritativeness_score(&lower, content),
                Factor::Completeness => completeness_score(&lower, metrics),
            };
            weight * value
        })
        .sum()
}

/// Piecewise score over word count; the sweet spot is 300-1000 words.
#[must_use]
pub fn length_score(word_count: usize) -> f32 {
    match word_count {
        0..=29 => 0.05,
        30..=49 => 0.15,
        50..=74 => 0.4,
        75..=149 => 0.8,
        150..=299 => 1.3,
        300..=1_000 => 1.5,
        1_001..=3_000 => 1.4,
        _ => 1.2,
    }
}

fn structure_score(metrics: &ContentMetrics) -> f32 {
    let mut score = 1.0;
    if metrics.has_code_blocks {
        score *= 1.2;
    }
    if metrics.has_lists {
        score *= 1.1;
    }
    if metrics.has_tables {
        score *= 1.05;
    }
    if metrics.has_semantic_tags {
        score *= 1.05;
    }
    if (10.0..=25.0).contains(&metrics.avg_sentence_length) {
        score *= 1.1;
    }
    if metrics.heading_count >= 3 {
        score *= 1.1;
    }
    score
}

fn content_type_score(lower: &str, title: &str) -> f32 {
    let title_lower = title.to_lowercase();
    let mut score = 1.0;

    let haystack = |word: &&str| lower.contains(*word) || title_lower.contains(*word);
    if EDUCATIONAL_STRONG.iter().any(haystack) {
        score *= 1.4;
    } else if EDUCATIONAL_MEDIUM.iter().any(haystack) {
        score *= 1.25;
    } else if EDUCATIONAL_WEAK.iter().any(haystack) {
        score *= 1.1;
    }

    #[allow(clippy::cast_precision_loss)]
    let positive = QUALITY_POSITIVE.iter().filter(|w| lower.contains(**w)).count() as f32;
    #[allow(clippy::cast_precision_loss)]
    let negative = QUALITY_NEGATIVE.iter().filter(|w| lower.contains(**w)).count() as f32;

    score *= 1.0 + positive * 0.08;
    score *= (1.0 - negative * 0.15).max(0.0);

    score.max(0.1)
}

#[allow(clippy::cast_precision_loss)]
fn language_quality_score(content: &str) -> f32 {
    let total = content.chars().count();
    if total == 0 {
        return 0.1;
    }
    let mut score = 1.0;

    let caps = content.chars().filter(|c| c.is_uppercase()).count() as f32 / total as f32;
    if (0.02..=0.08).contains(&caps) {
        score *= 1.1;
    } else if caps > 0.15 {
        score *= 0.8;
    }

    let punct = content
        .chars()
        .filter(|c| matches!(c, '.' | ',' | '!' | '?' | ';' | ':'))
        .count() as f32
        / total as f32;
    if (0.03..=0.12).contains(&punct) {
        score *= 1.05;
    }

    let words: Vec<String> = content
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if !words.is_empty() {
        let unique: std::collections::HashSet<&String> = words.iter().collect();
        if unique.len() as f32 / words.len() as f32 > 0.4 {
            score *= 1.1;
        }
    }

    score
}

fn metadata_score(metadata: &ScoringMetadata) -> f32 {
    let mut score = 1.0;

    if (10..=120).contains(&metadata.title.len()) {
        score *= 1.1;
    }
    let title_lower = metadata.title.to_lowercase();
    if ["how", "guide", "tutorial", "api"]
        .iter()
        .any(|w| title_lower.contains(w))
    {
        score *= 1.05;
    }
    if metadata.description.len() >= 50 {
        score *= 1.05;
    }
    if metadata.has_author {
        score *= 1.02;
    }
    if metadata.has_date {
        score *= 1.02;
    }

    score
}

#[allow(clippy::cast_precision_loss)]
fn technical_bonus(lower: &str, content: &str) -> f32 {
    let mut score = 1.0;

    let langs = PROG_LANGUAGES.iter().filter(|l| lower.contains(**l)).count() as f32;
    score *= 1.0 + langs * 0.05;

    let terms = TECH_TERMS.iter().filter(|t| lower.contains(**t)).count() as f32;
    score *= 1.0 + terms * 0.03;

    let concepts = ADVANCED_CONCEPTS.iter().filter(|c| lower.contains(**c)).count() as f32;
    score *= 1.0 + concepts * 0.04;

    if content.contains("```") || content.contains("<code>") {
        score *= 1.25;
    }
    if content.contains("def ") || content.contains("function ") || content.contains("fn ") {
        score *= 1.15;
    }
    if lower.contains("class ") {
        score *= 1.1;
    }

    score.min(2.5)
}

#[allow(clippy::cast_precision_loss)]
fn authoritativeness_score(lower: &str, content: &str) -> f32 {
    let mut score = 1.0;

    let citations = CITATION.find_iter(content).count() as f32;
    score *= 1.0 + (citations * 0.05).min(0.4);

    let years = YEAR_REF.find_iter(content).count() as f32;
    score *= 1.0 + (years * 0.04).min(0.3);

    if SCHOLARLY_ID.is_match(content) {
        score *= 1.2;
    }
    if CREDENTIAL_WORDS.iter().any(|w| lower.contains(w)) {
        score *= 1.1;
    }
    if INSTITUTION_WORDS.iter().any(|w| lower.contains(w)) {
        score *= 1.08;
    }

    score.min(2.0)
}

fn completeness_score(lower: &str, metrics: &ContentMetrics) -> f32 {
    let mut score = 1.0;

    #[allow(clippy::cast_precision_loss)]
    let coverage = COVERAGE_WORDS.iter().filter(|w| lower.contains(**w)).count() as f32;
    score *= 1.0 + coverage * 0.08;

    #[allow(clippy::cast_precision_loss)]
    let depth = DEPTH_WORDS.iter().filter(|w| lower.contains(**w)).count() as f32;
    score *= 1.0 + depth * 0.06;

    if metrics.heading_count >= 3 {
        score *= 1.15;
    }
    if metrics.heading_count >= 5 {
        score *= 1.05;
    }

    score.min(1.8)
}

/// Labels content against the fixed category vocabulary.
///
/// A category is emitted when at least two of its keywords occur in the
/// combined title and content; `general` is the fallback.
#[must_use]
pub fn content_categories(content: &str, title: &str) -> Vec<String> {
    let haystack = format!("{} {}", title.to_lowercase(), content.to_lowercase());

    let mut categories: Vec<String> = Vec::new();
    for (category, words) in CATEGORY_KEYWORDS {
        let hits: usize = words
            .iter()
            .map(|word| haystack.matches(word).count())
            .sum();
        if hits >= 2 {
            categories.push((*category).to_string());
        }
    }

    if categories.is_empty() {
        categories.push("general".to_string());
    }
    categories
}
