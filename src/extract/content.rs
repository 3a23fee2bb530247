//! Main-content extraction.
//!
//! A readability-style pass over the parsed tree. Content-marked
//! containers (article, main, doc-classed sections) are preferred when
//! they carry enough text; otherwise all block text outside page chrome is
//! gathered. The result is either at least fifty characters or empty,
//! never malformed.

use scraper::{ElementRef, Html};

/// Minimum size for a container to win the preferred path.
const CONTAINER_MIN_CHARS: usize = 200;

/// Minimum size of any returned content.
const CONTENT_MIN_CHARS: usize = 50;

/// Subtrees that never contribute to content.
const SKIPPED: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "form", "iframe", "svg",
    "button", "select", "template",
];

/// Block elements whose text is collected.
const BLOCK_TAGS: &[&str] = &["p", "li", "pre", "blockquote", "td", "dd", "figcaption"];

/// id/class fragments that mark a preferred content container.
const CONTAINER_MARKERS: &[&str] = &[
    "overview", "usage", "examples", "content", "documentation", "docs", "post-body", "entry",
];

/// Extracts the page's main textual content.
///
/// Returns a string of at least fifty characters, or an empty string when
/// the page has no usable content.
#[must_use]
pub fn extract_main_content(document: &Html) -> String {
    let container = best_container(document);
    if let Some(text) = &container
        && text.len() >= CONTAINER_MIN_CHARS
    {
        return text.clone();
    }

    // Generic pass over the whole body; when it also comes up short, keep
    // whichever candidate carries more text.
    let body_text = block_text(document.root_element());
    let chosen = if body_text.len() >= CONTAINER_MIN_CHARS {
        body_text
    } else {
        let longer_container = container.filter(|text| text.len() > body_text.len());
        longer_container.unwrap_or(body_text)
    };

    if chosen.len() >= CONTENT_MIN_CHARS {
        chosen
    } else {
        String::new()
    }
}

/// Finds the longest content-marked container on the page.
fn best_container(document: &Html) -> Option<String> {
    let mut best: Option<String> = None;
    find_containers(document.root_element(), &mut best);
    best
}

fn find_containers(element: ElementRef<'_>, best: &mut Option<String>) {
    for child in element.children() {
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let el = child.value();
        let name = el.name();

        if SKIPPED.contains(&name) {
            continue;
        }

        if is_content_container(child) {
            let text = block_text(child);
            if best.as_ref().is_none_or(|b| text.len() > b.len()) && !text.is_empty() {
                *best = Some(text);
            }
            // Containers may nest; the longest wins either way.
        }

        find_containers(child, best);
    }
}

fn is_content_container(element: ElementRef<'_>) -> bool {
    let el = element.value();
    match el.name() {
        "article" | "main" => true,
        "div" | "section" => {
            let markers = format!(
                "{} {}",
                el.attr("class").unwrap_or_default().to_lowercase(),
                el.attr("id").unwrap_or_default().to_lowercase()
            );
            CONTAINER_MARKERS.iter().any(|m| markers.contains(m))
        }
        _ => false,
    }
}

/// Gathers block-element text under `root`, skipping page chrome.
fn block_text(root: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    collect_blocks(root, &mut parts);
    parts.join("\n\n")
}

fn collect_blocks(element: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();

        if SKIPPED.contains(&name) {
            continue;
        }

        if BLOCK_TAGS.contains(&name) {
            let text: String = child.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.len() >= 20 {
                parts.push(text);
            }
            continue;
        }

        collect_blocks(child, parts);
    }
}
