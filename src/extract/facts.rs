//! Single-pass collection of raw page facts.
//!
//! The parsed tree is traversed exactly once; everything downstream works
//! from the [`RawFacts`] record, never from the DOM. Malformed JSON-LD is
//! tolerated and skipped.

use std::collections::HashMap;

use scraper::{ElementRef, Html};
use serde_json::Value;

use crate::model::TocEntry;

/// Subtrees that contribute no facts at all.
const SKIPPED: &[&str] = &["style", "noscript", "iframe", "svg", "template"];

/// Class fragments that mark an element as an author byline.
const AUTHOR_MARKERS: &[&str] = &["author", "byline", "writer", "contributor"];

/// Class fragments that mark an element as carrying a date.
const DATE_MARKERS: &[&str] = &["date", "published", "timestamp", "post-meta"];

/// A `<link>` tag's relevant attributes.
#[derive(Debug, Clone)]
pub struct LinkFact {
    /// The rel attribute, lowercased.
    pub rel: String,
    /// The href attribute.
    pub href: String,
}

/// An `<img>` tag's relevant attributes.
#[derive(Debug, Clone, Default)]
pub struct ImageFact {
    /// src or data-src attribute.
    pub src: String,
    /// alt text.
    pub alt: Option<String>,
    /// title attribute.
    pub title: Option<String>,
    /// Declared width.
    pub width: Option<u32>,
    /// Declared height.
    pub height: Option<u32>,
}

/// A `<time>` element or date-classed element.
#[derive(Debug, Clone)]
pub struct TimeFact {
    /// The machine-readable datetime attribute, when present.
    pub datetime: Option<String>,
    /// The human-readable element text.
    pub text: String,
}

/// An author candidate with the signal that produced it.
#[derive(Debug, Clone)]
pub struct AuthorCandidate {
    /// Where the candidate came from (rel, itemprop, class).
    pub source: &'static str,
    /// The candidate text.
    pub text: String,
}

/// Everything the single traversal gathers from the page.
#[derive(Debug, Default)]
pub struct RawFacts {
    /// The `<title>` element text.
    pub page_title: Option<String>,
    /// Meta tags keyed `name:*`, `property:*`, or `http-equiv:*`.
    pub meta: HashMap<String, String>,
    /// Parsed JSON-LD script bodies.
    pub json_ld: Vec<Value>,
    /// All `<link>` tags with rel and href.
    pub links: Vec<LinkFact>,
    /// Headings h1-h6 in document order.
    pub headings: Vec<TocEntry>,
    /// Page images in document order.
    pub images: Vec<ImageFact>,
    /// Time elements and date-classed texts.
    pub times: Vec<TimeFact>,
    /// Author-bearing elements.
    pub author_candidates: Vec<AuthorCandidate>,
    /// Links inside an explicit table-of-contents nav.
    pub toc_links: Vec<TocEntry>,
    /// Per-heading content score in [0, 1], parallel to `headings`:
    /// how much content follows the heading before the next heading of
    /// equal or higher level.
    pub heading_scores: Vec<f32>,
    /// `<section>`/`<article>` elements carrying an id and an inner
    /// heading, as TOC entries anchored to the id.
    pub sections: Vec<TocEntry>,
    /// Count of `<p>` elements.
    pub paragraph_count: usize,
    /// Page contains `<pre>` or `<code>`.
    pub has_code_blocks: bool,
    /// Page contains list markup.
    pub has_lists: bool,
    /// Page contains `<table>`.
    pub has_tables: bool,
    /// Page uses article/section/main tags.
    pub has_semantic_tags: bool,
}

/// A heading whose section is still open during the traversal.
struct OpenHeading {
    /// Index into `RawFacts::headings`.
    index: usize,
    /// Heading level, 1-6.
    level: u8,
    /// Content elements attributed so far (capped).
    elements: usize,
}

/// Traversal state threaded through the recursive walk.
#[derive(Default)]
struct WalkCtx {
    /// Headings whose sections have not been closed by an equal-or-higher
    /// heading yet; following content scores against all of them.
    open_headings: Vec<OpenHeading>,
    /// Indices into `RawFacts::sections` for enclosing id-bearing
    /// sections still waiting for their first inner heading.
    section_stack: Vec<usize>,
}

/// Content elements attributed to a heading, at most.
const HEADING_CONTENT_CAP: usize = 10;

/// Collects all raw facts from a parsed document in one traversal.
#[must_use]
pub fn collect_facts(document: &Html) -> RawFacts {
    let mut facts = RawFacts::default();
    let mut ctx = WalkCtx::default();
    walk(document.root_element(), &mut facts, &mut ctx, false);

    for score in &mut facts.heading_scores {
        *score = score.min(1.0);
    }
    // Sections that never produced an inner heading are not TOC material.
    facts.sections.retain(|section| !section.text.is_empty());
    facts
}

fn walk(element: ElementRef<'_>, facts: &mut RawFacts, ctx: &mut WalkCtx, in_toc_nav: bool) {
    for child in element.children() {
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let el = child.value();
        let name = el.name();

        if SKIPPED.contains(&name) {
            continue;
        }

        match name {
            "title" => {
                if facts.page_title.is_none() {
                    let text = element_text(child);
                    if !text.is_empty() {
                        facts.page_title = Some(text);
                    }
                }
            }
            "meta" => {
                collect_meta(el, facts);
            }
            "script" => {
                if el
                    .attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("application/ld+json"))
                {
                    collect_json_ld(child, facts);
                }
                // Other scripts carry no facts.
            }
            "link" => {
                if let (Some(rel), Some(href)) = (el.attr("rel"), el.attr("href")) {
                    facts.links.push(LinkFact {
                        rel: rel.to_lowercase(),
                        href: href.to_string(),
                    });
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let text = element_text(child);
                if !text.is_empty() && text.len() < 300 {
                    #[allow(clippy::cast_possible_truncation)]
                    let level = name.as_bytes()[1] - b'0';

                    // An equal-or-higher heading closes the open sections
                    // below it; deeper headings leave them open.
                    ctx.open_headings.retain(|open| open.level < level);
                    facts.headings.push(TocEntry {
                        level,
                        text: text.clone(),
                        anchor: el.attr("id").map(str::to_string),
                    });
                    facts.heading_scores.push(0.0);
                    ctx.open_headings.push(OpenHeading {
                        index: facts.headings.len() - 1,
                        level,
                        elements: 0,
                    });

                    // First heading inside an id-bearing section names it.
                    for section_idx in ctx.section_stack.iter().rev() {
                        if let Some(section) = facts.sections.get_mut(*section_idx)
                            && section.text.is_empty()
                        {
                            section.text = text.clone();
                            section.level = level;
                            break;
                        }
                    }
                }
            }
            "img" => {
                let src = el.attr("src").or_else(|| el.attr("data-src"));
                if let Some(src) = src
                    && !src.is_empty()
                    && !src.starts_with("data:")
                {
                    facts.images.push(ImageFact {
                        src: src.to_string(),
                        alt: el.attr("alt").map(str::to_string),
                        title: el.attr("title").map(str::to_string),
                        width: el.attr("width").and_then(|w| w.parse().ok()),
                        height: el.attr("height").and_then(|h| h.parse().ok()),
                    });
                }
            }
            "time" => {
                facts.times.push(TimeFact {
                    datetime: el.attr("datetime").map(str::to_string),
                    text: element_text(child),
                });
            }
            "a" if in_toc_nav => {
                let text = element_text(child);
                if !text.is_empty() && text.len() < 200 {
                    facts.toc_links.push(TocEntry {
                        level: 1,
                        text,
                        anchor: el.attr("href").map(str::to_string),
                    });
                }
                continue;
            }
            "p" => facts.paragraph_count += 1,
            "pre" | "code" => facts.has_code_blocks = true,
            "ul" | "ol" => facts.has_lists = true,
            "table" => facts.has_tables = true,
            "article" | "section" | "main" => facts.has_semantic_tags = true,
            _ => {}
        }

        score_heading_content(child, name, facts, ctx);

        let mut pushed_section = false;
        if matches!(name, "article" | "section")
            && let Some(id) = el.attr("id")
            && !id.is_empty()
        {
            facts.sections.push(TocEntry {
                level: 1,
                text: String::new(),
                anchor: Some(format!("#{id}")),
            });
            ctx.section_stack.push(facts.sections.len() - 1);
            pushed_section = true;
        }

        collect_annotated(child, facts);

        let toc_nav = in_toc_nav || is_toc_container(child);
        walk(child, facts, ctx, toc_nav);

        if pushed_section {
            ctx.section_stack.pop();
        }
    }
}

/// Attributes a content element to every heading whose section is open.
///
/// Mirrors the per-heading sibling scan: element count and text length
/// accumulate until a heading of equal or higher level closes the
/// section, with a cap on attributed elements per heading.
#[allow(clippy::cast_precision_loss)]
fn score_heading_content(
    child: ElementRef<'_>,
    name: &str,
    facts: &mut RawFacts,
    ctx: &mut WalkCtx,
) {
    const SCORED: &[&str] = &["p", "ul", "ol", "table", "pre", "blockquote"];
    if !SCORED.contains(&name) || ctx.open_headings.is_empty() {
        return;
    }
    // A block nested inside another scored block already counted.
    const COVERED_PARENTS: &[&str] = &["p", "ul", "ol", "table", "pre", "blockquote", "li", "td"];
    if child
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| COVERED_PARENTS.contains(&parent.value().name()))
    {
        return;
    }

    let text_len = element_text(child).len();
    if text_len == 0 {
        return;
    }

    for open in &mut ctx.open_headings {
        if open.elements >= HEADING_CONTENT_CAP {
            continue;
        }
        open.elements += 1;
        if let Some(score) = facts.heading_scores.get_mut(open.index) {
            *score += 0.2 + text_len as f32 * 0.001;
        }
    }
}

/// Picks up author and date signals carried via attributes on any element.
fn collect_annotated(element: ElementRef<'_>, facts: &mut RawFacts) {
    let el = element.value();

    if el.attr("rel").is_some_and(|rel| rel.contains("author")) {
        push_author(facts, "rel", element);
        return;
    }
    if let Some(itemprop) = el.attr("itemprop") {
        if itemprop.contains("author") {
            push_author(facts, "itemprop", element);
            return;
        }
        if itemprop.contains("datePublished") || itemprop.contains("dateModified") {
            facts.times.push(TimeFact {
                datetime: el.attr("content").map(str::to_string),
                text: element_text(element),
            });
            return;
        }
    }
    if let Some(class) = el.attr("class") {
        let class = class.to_lowercase();
        if AUTHOR_MARKERS.iter().any(|m| class.contains(m)) {
            push_author(facts, "class", element);
        } else if DATE_MARKERS.iter().any(|m| class.contains(m)) {
            let text = element_text(element);
            if !text.is_empty() && text.len() < 80 {
                facts.times.push(TimeFact {
                    datetime: None,
                    text,
                });
            }
        }
    }
}

fn push_author(facts: &mut RawFacts, source: &'static str, element: ElementRef<'_>) {
    let text = element_text(element);
    if !text.is_empty() && text.len() < 120 {
        facts.author_candidates.push(AuthorCandidate { source, text });
    }
}

fn collect_meta(el: &scraper::node::Element, facts: &mut RawFacts) {
    let Some(content) = el.attr("content") else {
        return;
    };
    let key = el
        .attr("name")
        .map(|n| format!("name:{}", n.to_lowercase()))
        .or_else(|| el.attr("property").map(|p| format!("property:{}", p.to_lowercase())))
        .or_else(|| {
            el.attr("http-equiv")
                .map(|h| format!("http-equiv:{}", h.to_lowercase()))
        });
    if let Some(key) = key {
        facts.meta.entry(key).or_insert_with(|| content.to_string());
    }
}

fn collect_json_ld(element: ElementRef<'_>, facts: &mut RawFacts) {
    let body: String = element.text().collect();
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(values)) => facts.json_ld.extend(values),
        Ok(value) => facts.json_ld.push(value),
        Err(_) => {
            // Malformed structured data never aborts extraction.
        }
    }
}

fn is_toc_container(element: ElementRef<'_>) -> bool {
    let el = element.value();
    if el.name() != "nav" && el.name() != "div" {
        return false;
    }
    let markers = format!(
        "{} {}",
        el.attr("class").unwrap_or_default().to_lowercase(),
        el.attr("id").unwrap_or_default().to_lowercase()
    );
    markers.contains("toc") || markers.contains("table-of-contents")
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts_for(html: &str) -> RawFacts {
        collect_facts(&Html::parse_document(html))
    }

    #[test]
    fn test_collects_title_and_meta() {
        let facts = facts_for(
            r#"<html><head><title>Hello Page</title>
               <meta name="description" content="A post"/>
               <meta property="og:title" content="Hello OG"/>
               <meta http-equiv="content-language" content="en"/>
               </head><body></body></html>"#,
        );
        assert_eq!(facts.page_title.as_deref(), Some("Hello Page"));
        assert_eq!(facts.meta.get("name:description").map(String::as_str), Some("A post"));
        assert_eq!(
            facts.meta.get("property:og:title").map(String::as_str),
            Some("Hello OG")
        );
        assert_eq!(
            facts.meta.get("http-equiv:content-language").map(String::as_str),
            Some("en")
        );
    }

    #[test]
    fn test_collects_headings_in_order() {
        let facts = facts_for(
            "<html><body><h1 id=\"top\">Title</h1><p>x</p>\
             <h2>Section A</h2><h3>Detail</h3></body></html>",
        );
        assert_eq!(facts.headings.len(), 3);
        assert_eq!(facts.headings[0].level, 1);
        assert_eq!(facts.headings[0].anchor.as_deref(), Some("top"));
        assert_eq!(facts.headings[1].text, "Section A");
        assert_eq!(facts.headings[2].level, 3);
    }

    #[test]
    fn test_collects_json_ld() {
        let facts = facts_for(
            r#"<html><head>
               <script type="application/ld+json">{"@type":"Article","headline":"JSON Title"}</script>
               <script type="application/ld+json">not valid json</script>
               </head><body></body></html>"#,
        );
        assert_eq!(facts.json_ld.len(), 1);
        assert_eq!(facts.json_ld[0]["headline"], "JSON Title");
    }

    #[test]
    fn test_json_ld_array_flattened() {
        let facts = facts_for(
            r#"<html><head><script type="application/ld+json">
               [{"@type":"Article"},{"@type":"Person"}]
               </script></head><body></body></html>"#,
        );
        assert_eq!(facts.json_ld.len(), 2);
    }

    #[test]
    fn test_collects_links_and_images() {
        let facts = facts_for(
            r#"<html><head><link rel="canonical" href="https://example.com/post"/>
               <link rel="icon" href="/favicon.ico"/></head>
               <body><img src="/a.png" alt="diagram" width="640" height="480"/>
               <img src="data:image/png;base64,xyz"/></body></html>"#,
        );
        assert_eq!(facts.links.len(), 2);
        assert_eq!(facts.links[0].rel, "canonical");
        // data: URIs are dropped.
        assert_eq!(facts.images.len(), 1);
        assert_eq!(facts.images[0].width, Some(640));
        assert_eq!(facts.images[0].alt.as_deref(), Some("diagram"));
    }

    #[test]
    fn test_collects_time_and_date_classes() {
        let facts = facts_for(
            r#"<html><body>
               <time datetime="2025-03-04T10:00:00Z">March 4</time>
               <span class="published-date">2025-03-05</span>
               </body></html>"#,
        );
        assert_eq!(facts.times.len(), 2);
        assert_eq!(
            facts.times[0].datetime.as_deref(),
            Some("2025-03-04T10:00:00Z")
        );
        assert_eq!(facts.times[1].text, "2025-03-05");
    }

    #[test]
    fn test_collects_author_candidates() {
        let facts = facts_for(
            r#"<html><body>
               <a rel="author" href="/jo">Jo Writer</a>
               <span itemprop="author">Sam Scribe</span>
               <div class="byline">By Pat Penner</div>
               </body></html>"#,
        );
        assert_eq!(facts.author_candidates.len(), 3);
        assert_eq!(facts.author_candidates[0].source, "rel");
        assert_eq!(facts.author_candidates[1].text, "Sam Scribe");
        assert_eq!(facts.author_candidates[2].source, "class");
    }

    #[test]
    fn test_collects_toc_nav_links() {
        let facts = facts_for(
            r##"<html><body><nav class="toc">
               <a href="#intro">Introduction</a>
               <a href="#usage">Usage</a>
               </nav>
               <a href="/elsewhere">Not a toc link</a></body></html>"##,
        );
        assert_eq!(facts.toc_links.len(), 2);
        assert_eq!(facts.toc_links[0].anchor.as_deref(), Some("#intro"));
        assert_eq!(facts.toc_links[1].text, "Usage");
    }

    #[test]
    fn test_heading_scores_follow_content() {
        let body = "word ".repeat(120);
        let facts = facts_for(&format!(
            "<html><body>\
             <h2>Rich Section</h2><p>{body}</p><p>{body}</p>\
             <h2>Bare Section</h2>\
             </body></html>"
        ));
        assert_eq!(facts.headings.len(), 2);
        assert_eq!(facts.heading_scores.len(), 2);
        assert!(facts.heading_scores[0] > 0.0);
        assert!((facts.heading_scores[1] - 0.0).abs() < f32::EPSILON);
        // Scores are capped at 1.0.
        assert!(facts.heading_scores[0] <= 1.0);
    }

    #[test]
    fn test_heading_scores_stop_at_equal_level() {
        let body = "word ".repeat(60);
        let facts = facts_for(&format!(
            "<html><body>\
             <h2>First</h2>\
             <h2>Second</h2><p>{body}</p>\
             </body></html>"
        ));
        // Content after the second h2 never scores against the first.
        assert!((facts.heading_scores[0] - 0.0).abs() < f32::EPSILON);
        assert!(facts.heading_scores[1] > 0.0);
    }

    #[test]
    fn test_nested_heading_content_scores_both() {
        let body = "word ".repeat(60);
        let facts = facts_for(&format!(
            "<html><body>\
             <h2>Outer</h2>\
             <h3>Inner</h3><p>{body}</p>\
             </body></html>"
        ));
        // The paragraph under the h3 also belongs to the open h2 section.
        assert!(facts.heading_scores[0] > 0.0);
        assert!(facts.heading_scores[1] > 0.0);
    }

    #[test]
    fn test_sections_with_ids_collected() {
        let facts = facts_for(
            "<html><body>\
             <section id=\"installation\"><h2>Installing</h2><p>steps</p></section>\
             <section><h2>Anonymous</h2></section>\
             <article id=\"empty-article\"><p>no heading inside</p></article>\
             </body></html>",
        );
        // Only id-bearing sections with an inner heading survive.
        assert_eq!(facts.sections.len(), 1);
        assert_eq!(facts.sections[0].text, "Installing");
        assert_eq!(facts.sections[0].level, 2);
        assert_eq!(facts.sections[0].anchor.as_deref(), Some("#installation"));
    }

    #[test]
    fn test_structure_flags() {
        let facts = facts_for(
            "<html><body><article><p>a</p><p>b</p><pre>code</pre>\
             <ul><li>x</li></ul><table><tr><td>1</td></tr></table>\
             </article></body></html>",
        );
        assert_eq!(facts.paragraph_count, 2);
        assert!(facts.has_code_blocks);
        assert!(facts.has_lists);
        assert!(facts.has_tables);
        assert!(facts.has_semantic_tags);
    }

    #[test]
    fn test_empty_document() {
        let facts = facts_for("");
        assert!(facts.page_title.is_none());
        assert!(facts.meta.is_empty());
        assert!(facts.headings.is_empty());
    }
}
