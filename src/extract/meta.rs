//! Pure metadata derivations over the raw facts.

use serde_json::Value;
use url::Url;

use super::facts::RawFacts;
use crate::model::{AuthorInfo, ContentType, IconSet, ImageInfo};

/// Minimum length for a usable description candidate.
const MIN_DESCRIPTION_CHARS: usize = 10;

/// Maximum images retained per document.
const MAX_IMAGES: usize = 10;

/// Consolidated title, in priority order: OpenGraph, JSON-LD headline,
/// page `<title>`.
#[must_use]
pub fn derive_title(facts: &RawFacts) -> Option<String> {
    facts
        .meta
        .get("property:og:title")
        .cloned()
        .or_else(|| json_ld_string(facts, "headline"))
        .or_else(|| json_ld_string(facts, "name"))
        .or_else(|| facts.page_title.clone())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Chosen description: og:description, meta description, then JSON-LD
/// description, each required to carry at least ten characters.
#[must_use]
pub fn derive_description(facts: &RawFacts) -> Option<String> {
    ["property:og:description", "name:description"]
        .iter()
        .filter_map(|key| facts.meta.get(*key))
        .map(|d| d.trim().to_string())
        .find(|d| d.len() >= MIN_DESCRIPTION_CHARS)
        .or_else(|| {
            json_ld_string(facts, "description").filter(|d| d.len() >= MIN_DESCRIPTION_CHARS)
        })
}

/// Author-declared keywords from the keywords meta tag, case preserved.
#[must_use]
pub fn derive_author_keywords(facts: &RawFacts) -> Vec<String> {
    facts
        .meta
        .get("name:keywords")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty() && k.len() <= 60)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Canonical URL from the rel=canonical link, resolved against the base.
#[must_use]
pub fn derive_canonical_url(facts: &RawFacts, base_url: &str) -> Option<String> {
    facts
        .links
        .iter()
        .find(|link| link.rel.split_whitespace().any(|r| r == "canonical"))
        .and_then(|link| resolve_url(base_url, &link.href))
}

/// Icon links: favicon, apple touch icon, and web manifest.
#[must_use]
pub fn derive_icons(facts: &RawFacts, base_url: &str) -> Option<IconSet> {
    let mut icons = IconSet::default();
    for link in &facts.links {
        let resolved = || resolve_url(base_url, &link.href);
        if link.rel.contains("apple-touch-icon") {
            if icons.apple_touch.is_none() {
                icons.apple_touch = resolved();
            }
        } else if link.rel.split_whitespace().any(|r| r == "icon" || r == "shortcut") {
            if icons.favicon.is_none() {
                icons.favicon = resolved();
            }
        } else if link.rel.contains("manifest") && icons.manifest.is_none() {
            icons.manifest = resolved();
        }
    }
    (!icons.is_empty()).then_some(icons)
}

/// Top page images with resolved URLs, alt and title retained.
#[must_use]
pub fn derive_images(facts: &RawFacts, base_url: &str) -> Vec<ImageInfo> {
    facts
        .images
        .iter()
        .filter_map(|image| {
            let url = resolve_url(base_url, &image.src)?;
            Some(ImageInfo {
                url,
                alt: image.alt.clone().filter(|a| !a.is_empty()),
                title: image.title.clone().filter(|t| !t.is_empty()),
                width: image.width,
                height: image.height,
            })
        })
        .take(MAX_IMAGES)
        .collect()
}

/// Author derivation: meta tags, structured data, then annotated elements.
#[must_use]
pub fn derive_author(facts: &RawFacts) -> Option<AuthorInfo> {
    if let Some(name) = facts
        .meta
        .get("name:author")
        .or_else(|| facts.meta.get("property:article:author"))
    {
        let name = name.trim();
        if !name.is_empty() && !name.starts_with("http") {
            return Some(AuthorInfo {
                name: Some(name.to_string()),
                url: None,
                source: Some("meta".to_string()),
            });
        }
    }

    if let Some(name) = json_ld_author(facts) {
        return Some(AuthorInfo {
            name: Some(name),
            url: None,
            source: Some("json-ld".to_string()),
        });
    }

    facts.author_candidates.first().map(|candidate| {
        let text = candidate.text.trim();
        let name = text
            .strip_prefix("By ")
            .or_else(|| text.strip_prefix("by "))
            .unwrap_or(text);
        AuthorInfo {
            name: Some(name.to_string()),
            url: None,
            source: Some(candidate.source.to_string()),
        }
    })
}

/// Looks up a string field across the page's JSON-LD blocks, descending
/// into `@graph` arrays.
fn json_ld_string(facts: &RawFacts, field: &str) -> Option<String> {
    facts.json_ld.iter().find_map(|value| {
        if let Some(direct) = value.get(field).and_then(Value::as_str) {
            return Some(direct.to_string());
        }
        value.get("@graph").and_then(Value::as_array).and_then(|graph| {
            graph
                .iter()
                .find_map(|entry| entry.get(field).and_then(Value::as_str).map(str::to_string))
        })
    })
}

fn json_ld_author(facts: &RawFacts) -> Option<String> {
    facts.json_ld.iter().find_map(|value| {
        let author = value.get("author").or_else(|| {
            value
                .get("@graph")
                .and_then(Value::as_array)
                .and_then(|graph| graph.iter().find_map(|entry| entry.get("author")))
        })?;
        match author {
            Value::String(name) => Some(name.clone()),
            Value::Object(_) => author
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::Array(authors) => authors
                .first()
                .and_then(|a| a.get("name").and_then(Value::as_str))
                .map(str::to_string),
            _ => None,
        }
    })
}

/// Content classification from the URL path and page metadata.
#[must_use]
pub fn derive_content_type(facts: &RawFacts, url: &str) -> ContentType {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_default();

    if path.contains("/docs") || path.contains("/documentation") || path.contains("/reference") {
        return ContentType::Documentation;
    }
    if path.contains("/tutorial") || path.contains("how-to") || path.contains("/guide") {
        return ContentType::Tutorial;
    }
    if path.contains("/blog") {
        return ContentType::Blog;
    }
    if path.contains("/news") {
        return ContentType::News;
    }
    if path.contains("/forum") || path.contains("/thread") || path.contains("/questions") {
        return ContentType::Forum;
    }
    if path.contains("/abs/") || path.contains("/paper") || url.contains("arxiv.org") {
        return ContentType::Academic;
    }

    match facts.meta.get("property:og:type").map(String::as_str) {
        Some("article") => ContentType::Article,
        Some(og) if og.contains("blog") => ContentType::Blog,
        Some("website") => ContentType::General,
        _ => ContentType::Article,
    }
}

/// Resolves a possibly relative href against the page URL.
#[must_use]
pub fn resolve_url(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(Into::into)
}
