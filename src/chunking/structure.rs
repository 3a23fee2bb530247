//! Structure-based chunking strategy.
//!
//! When raw HTML is available, chunk boundaries follow the heading
//! hierarchy: each heading opens a section that accumulates content
//! elements until the next heading of equal or higher level. Elements are
//! importance-scored and low-value ones (navigation, boilerplate) are
//! dropped before the section becomes a chunk.

use scraper::{ElementRef, Html};

use super::traits::ChunkerConfig;

/// Elements whose subtrees never contribute content.
const SKIPPED: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "form", "iframe", "svg",
    "button", "select",
];

/// Leaf-ish block elements collected as content units.
const CONTENT_TAGS: &[&str] = &["p", "li", "pre", "blockquote", "td", "dd"];

/// Class/id substrings that mark main content.
const CONTENT_MARKERS: &[&str] = &["content", "article", "main", "post", "body", "entry"];

/// Class/id substrings that mark chrome around the content.
const CHROME_MARKERS: &[&str] = &[
    "nav", "menu", "sidebar", "footer", "comment", "related", "share", "promo", "banner", "cookie",
];

enum Piece {
    Heading { level: u8, text: String },
    Content { text: String },
}

/// Heading-section chunker over raw HTML.
///
/// This strategy does not implement [`super::Chunker`]: it needs the
/// original markup, not the cleaned text. The dispatcher prefers it
/// whenever HTML is available and falls back when it produces nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureChunker;

impl StructureChunker {
    /// Splits a page into heading-aligned sections.
    ///
    /// A section stays open across deeper headings: only a heading of
    /// equal or higher level closes it, so an `h3` subsection remains
    /// part of the `h2` section that contains it.
    #[must_use]
    pub fn chunk_html(&self, html: &str, config: &ChunkerConfig) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut pieces: Vec<Piece> = Vec::new();
        collect_pieces(document.root_element(), config, &mut pieces);

        let mut chunks: Vec<String> = Vec::new();
        let mut section = String::new();
        let mut section_level: Option<u8> = None;

        for piece in pieces {
            match piece {
                Piece::Heading { level, text } => {
                    if section_level.is_none_or(|open| level <= open) {
                        flush_section(&mut section, &mut chunks);
                        section.push_str(&text);
                        section_level = Some(level);
                    } else {
                        // Deeper heading: subsection of the open section.
                        if !section.is_empty() {
                            section.push(' ');
                        }
                        section.push_str(&text);
                    }
                }
                Piece::Content { text } => {
                    if !section.is_empty() {
                        section.push(' ');
                    }
                    section.push_str(&text);
                }
            }
        }
        flush_section(&mut section, &mut chunks);

        chunks
    }

    /// Strategy name for logging and diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        "structure"
    }
}

fn flush_section(section: &mut String, chunks: &mut Vec<String>) {
    let text = section.trim();
    if text.len() >= 50 {
        chunks.push(text.to_string());
    }
    section.clear();
}

fn collect_pieces(element: ElementRef<'_>, config: &ChunkerConfig, out: &mut Vec<Piece>) {
    for child in element.children() {
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();

        if SKIPPED.contains(&name) {
            continue;
        }

        if let Some(level) = heading_level(name) {
            let text = element_text(child);
            if !text.is_empty() && text.len() < 300 {
                out.push(Piece::Heading { level, text });
            }
            continue;
        }

        if CONTENT_TAGS.contains(&name) {
            let text = element_text(child);
            if !text.is_empty() && element_importance(child, &text) >= config.importance_threshold {
                out.push(Piece::Content { text });
            }
            continue;
        }

        collect_pieces(child, config, out);
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    let joined: String = element.text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scores an element by length, vocabulary diversity, tag semantics, and
/// class markers. Range is roughly [0, 1.5].
#[allow(clippy::cast_precision_loss)]
fn element_importance(element: ElementRef<'_>, text: &str) -> f32 {
    let length_score = (text.len() as f32 / 500.0).min(1.0);

    let words: Vec<&str> = text.split_whitespace().collect();
    let unique: std::collections::HashSet<String> =
        words.iter().map(|w| w.to_lowercase()).collect();
    let diversity = if words.is_empty() {
        0.0
    } else {
        unique.len() as f32 / words.len() as f32
    };

    let tag_weight = match element.value().name() {
        "pre" => 0.9,
        "p" => 0.8,
        "blockquote" => 0.7,
        "td" | "dd" => 0.5,
        _ => 0.4, // li and anything else collected
    };

    let mut score = length_score * 0.4 + diversity * 0.3 + tag_weight * 0.3;

    let markers = marker_string(element);
    if CONTENT_MARKERS.iter().any(|m| markers.contains(m)) {
        score += 0.2;
    }
    if CHROME_MARKERS.iter().any(|m| markers.contains(m)) {
        score -= 0.5;
    }

    score
}

/// Lowercased class and id attributes of the element and its parent.
fn marker_string(element: ElementRef<'_>) -> String {
    let mut markers = String::new();
    for el in [Some(element), element.parent().and_then(ElementRef::wrap)]
        .into_iter()
        .flatten()
    {
        if let Some(class) = el.value().attr("class") {
            markers.push_str(&class.to_lowercase());
            markers.push(' ');
        }
        if let Some(id) = el.value().attr("id") {
            markers.push_str(&id.to_lowercase());
            markers.push(' ');
        }
    }
    markers
}
