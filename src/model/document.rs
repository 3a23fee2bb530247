//! Document metadata record: one per URL.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ContentType;

/// Author information derived from page metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    /// Display name of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Profile or byline URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Where the author was found (meta, json-ld, byline, cms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl AuthorInfo {
    /// Returns true when no field carries a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none()
    }
}

/// A page image retained for display purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Resolved absolute image URL.
    pub url: String,
    /// Alt text, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Title attribute, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Declared width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Declared height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// One entry of a document's table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level, 1-6.
    pub level: u8,
    /// Heading text.
    pub text: String,
    /// Anchor fragment for in-page navigation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

/// Icon links discovered on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSet {
    /// Standard favicon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Apple touch icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apple_touch: Option<String>,
    /// Web app manifest URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

impl IconSet {
    /// Returns true when no icon was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.favicon.is_none() && self.apple_touch.is_none() && self.manifest.is_none()
    }
}

/// Content-shape metrics computed during extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticInfo {
    /// Word count of the cleaned main content.
    pub word_count: usize,
    /// Sentence count.
    pub sentence_count: usize,
    /// Paragraph count.
    pub paragraph_count: usize,
    /// Estimated reading time at 200 wpm.
    pub reading_time_minutes: f32,
    /// Number of headings on the page.
    pub headings_count: usize,
    /// Whether the page reads as technical content.
    pub is_technical_content: bool,
}

/// The metadata record stored once per URL.
///
/// Opaque fields (`author_info`, `images`, `table_of_contents`,
/// `structured_data`, `icons`) are stored for display but never analyzed by
/// the search path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity: hex MD5 of the raw URL.
    pub document_id: String,
    /// The raw URL the record was crawled from.
    pub url: String,
    /// Canonical URL declared by the page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    /// Host the document belongs to.
    pub domain: String,
    /// Consolidated title.
    pub title: String,
    /// Preview description.
    pub description: String,
    /// Content classification.
    pub content_type: ContentType,
    /// Category labels from the fixed vocabulary.
    pub categories: Vec<String>,
    /// Up to ten keywords, author-declared first.
    pub keywords: Vec<String>,
    /// RFC-3339 publication date, if discovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// RFC-3339 modification date, if discovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
    /// Author details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_info: Option<AuthorInfo>,
    /// Top page images with resolved URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageInfo>,
    /// Table of contents derived from the page structure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_of_contents: Vec<TocEntry>,
    /// Content-shape metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_info: Option<SemanticInfo>,
    /// Raw JSON-LD blocks found on the page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structured_data: Vec<Value>,
    /// Icon links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<IconSet>,
    /// Word count of the cleaned main content.
    #[serde(default)]
    pub word_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_serialization_omits_empty_fields() {
        let doc = Document {
            document_id: "abc".to_string(),
            url: "https://example.com/post".to_string(),
            domain: "example.com".to_string(),
            title: "Hello".to_string(),
            description: "A post".to_string(),
            ..Document::default()
        };

        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("canonical_url"));
        assert!(!json.contains("author_info"));
        assert!(!json.contains("images"));
        assert!(json.contains("\"content_type\":\"article\""));
    }

    #[test]
    fn test_document_round_trip() {
        let doc = Document {
            document_id: "abc".to_string(),
            url: "https://example.com/post".to_string(),
            canonical_url: Some("https://example.com/post".to_string()),
            domain: "example.com".to_string(),
            title: "Hello".to_string(),
            description: "A post".to_string(),
            content_type: ContentType::Tutorial,
            categories: vec!["educational".to_string()],
            keywords: vec!["rust".to_string(), "search".to_string()],
            published_date: Some("2025-05-01T00:00:00Z".to_string()),
            author_info: Some(AuthorInfo {
                name: Some("Jo Writer".to_string()),
                url: None,
                source: Some("meta".to_string()),
            }),
            ..Document::default()
        };

        let json = serde_json::to_string(&doc).unwrap();
        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.document_id, doc.document_id);
        assert_eq!(parsed.content_type, ContentType::Tutorial);
        assert_eq!(parsed.keywords, doc.keywords);
        assert_eq!(
            parsed.author_info.and_then(|a| a.name),
            Some("Jo Writer".to_string())
        );
    }

    #[test]
    fn test_author_info_is_empty() {
        assert!(AuthorInfo::default().is_empty());
        let named = AuthorInfo {
            name: Some("Jo".to_string()),
            ..AuthorInfo::default()
        };
        assert!(!named.is_empty());
    }

    #[test]
    fn test_icon_set_is_empty() {
        assert!(IconSet::default().is_empty());
        let icons = IconSet {
            favicon: Some("https://example.com/favicon.ico".to_string()),
            ..IconSet::default()
        };
        assert!(!icons.is_empty());
    }
}
