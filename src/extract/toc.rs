//! Table-of-contents derivation.
//!
//! Four tiers, in preference order: an explicit TOC nav on the page, the
//! heading hierarchy weighted by per-heading content scores, id-bearing
//! `<section>`/`<article>` elements, and finally anchors synthesized from
//! heading text alone.

use super::facts::RawFacts;
use crate::model::TocEntry;

/// Maximum TOC entries retained.
const MAX_ENTRIES: usize = 15;

/// Minimum headings for the scored-hierarchy tier to apply.
const MIN_HEADINGS: usize = 3;

/// Heading texts matching these fragments are navigation, not contents.
const SKIP_PATTERNS: &[&str] = &[
    "menu", "navigation", "search", "login", "register", "footer", "header", "sidebar", "share",
    "related", "comments", "tags", "categories", "recent posts",
];

/// Derives a table of contents from the raw facts.
#[must_use]
pub fn derive_toc(facts: &RawFacts) -> Vec<TocEntry> {
    if !facts.toc_links.is_empty() {
        return facts.toc_links.iter().take(MAX_ENTRIES).cloned().collect();
    }

    if facts.headings.len() >= MIN_HEADINGS {
        let entries = scored_heading_toc(facts);
        if !entries.is_empty() {
            return entries;
        }
    }

    if !facts.sections.is_empty() {
        return facts.sections.iter().take(MAX_ENTRIES).cloned().collect();
    }

    // Last resort: whatever headings exist, anchored by synthesized slugs.
    facts
        .headings
        .iter()
        .filter(|heading| !is_navigation_heading(&heading.text))
        .take(MAX_ENTRIES)
        .map(|heading| TocEntry {
            level: heading.level,
            text: heading.text.clone(),
            anchor: synthesize_anchor(&heading.text),
        })
        .collect()
}

/// The heading-hierarchy tier: navigation headings dropped, declared ids
/// preferred as anchors, and the entry budget spent on the headings with
/// the most content behind them.
fn scored_heading_toc(facts: &RawFacts) -> Vec<TocEntry> {
    let mut scored: Vec<(usize, f32, TocEntry)> = facts
        .headings
        .iter()
        .enumerate()
        .filter(|(_, heading)| !is_navigation_heading(&heading.text))
        .map(|(position, heading)| {
            let score = facts.heading_scores.get(position).copied().unwrap_or(0.0);
            let entry = TocEntry {
                level: heading.level,
                text: heading.text.clone(),
                anchor: heading
                    .anchor
                    .as_ref()
                    .map(|id| format!("#{id}"))
                    .or_else(|| synthesize_anchor(&heading.text)),
            };
            (position, score, entry)
        })
        .collect();

    if scored.len() > MAX_ENTRIES {
        // Keep the most content-backed headings, then restore document order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(MAX_ENTRIES);
        scored.sort_by_key(|(position, _, _)| *position);
    }

    scored.into_iter().map(|(_, _, entry)| entry).collect()
}

fn is_navigation_heading(text: &str) -> bool {
    let lower = text.to_lowercase();
    SKIP_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Builds a slug anchor from heading text.
fn synthesize_anchor(text: &str) -> Option<String> {
    let slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug: String = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    (!slug.is_empty()).then(|| format!("#{slug}"))
}
