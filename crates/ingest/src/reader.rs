//! Readers turn fetched bytes into plain text.
//!
//! Each reader declares the content types it handles. The [`ReaderRegistry`]
//! is the explicit content-type table the document builder consults; it is
//! filled once at startup, usually from [`ReaderKind`]s in configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use canonical::tidy_whitespace;
use quick_xml::events::Event;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReadError;

/// Converts raw document bytes into the text that gets tokenized.
pub trait Reader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<String, ReadError>;

    /// Normalized content types this reader accepts.
    fn content_types(&self) -> &'static [&'static str];
}

/// Lower-case a content type and strip its parameters.
///
/// `"Text/HTML; charset=UTF-8"` becomes `"text/html"`.
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

fn utf8(bytes: &[u8]) -> Result<&str, ReadError> {
    std::str::from_utf8(bytes).map_err(|err| ReadError::InvalidUtf8(err.to_string()))
}

/// `text/plain`: the bytes are the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

impl Reader for PlainTextReader {
    fn read(&self, bytes: &[u8]) -> Result<String, ReadError> {
        Ok(utf8(bytes)?.to_string())
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["text/plain"]
    }
}

/// HTML documents, read with `scraper`.
///
/// Text inside `script`, `style`, `noscript` and `template` is skipped. Block
/// elements end a line so their words never run together.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReader;

const HTML_SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];

const HTML_BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "title", "tr", "ul",
];

impl HtmlReader {
    fn collect(element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                let name = child_element.value().name();
                if HTML_SKIPPED.contains(&name) {
                    continue;
                }
                let block = HTML_BLOCKS.contains(&name);
                if block {
                    out.push('\n');
                }
                Self::collect(child_element, out);
                if block {
                    out.push('\n');
                }
            } else if let Some(text) = child.value().as_text() {
                out.push_str(text);
            }
        }
    }
}

impl Reader for HtmlReader {
    fn read(&self, bytes: &[u8]) -> Result<String, ReadError> {
        let html = Html::parse_document(&String::from_utf8_lossy(bytes));
        let mut out = String::new();
        Self::collect(html.root_element(), &mut out);
        Ok(tidy_whitespace(&out))
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["text/html", "application/xhtml+xml"]
    }
}

/// XML documents and feeds, read with `quick-xml`.
///
/// Every text and CDATA node becomes its own line; markup is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlReader;

impl Reader for XmlReader {
    fn read(&self, bytes: &[u8]) -> Result<String, ReadError> {
        let malformed = |message: String| ReadError::Malformed {
            content_type: "xml".to_string(),
            message,
        };

        let mut reader = quick_xml::Reader::from_str(utf8(bytes)?);
        reader.config_mut().trim_text(true);

        let mut out = String::new();
        loop {
            match reader.read_event() {
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|err| malformed(err.to_string()))?;
                    out.push_str(&text);
                    out.push('\n');
                }
                Ok(Event::CData(data)) => {
                    out.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    out.push('\n');
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    return Err(malformed(format!(
                        "{err} at byte {}",
                        reader.error_position()
                    )))
                }
            }
        }

        Ok(tidy_whitespace(&out))
    }

    fn content_types(&self) -> &'static [&'static str] {
        &[
            "application/xml",
            "text/xml",
            "application/rss+xml",
            "application/atom+xml",
        ]
    }
}

/// JSON documents: every string value, in document order, one per line.
///
/// Object keys are structure, not content, and are left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl JsonReader {
    fn collect(value: &Value, out: &mut String) {
        match value {
            Value::String(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Value::Array(items) => items.iter().for_each(|item| Self::collect(item, out)),
            Value::Object(fields) => fields.values().for_each(|item| Self::collect(item, out)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

impl Reader for JsonReader {
    fn read(&self, bytes: &[u8]) -> Result<String, ReadError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|err| ReadError::Malformed {
            content_type: "json".to_string(),
            message: err.to_string(),
        })?;
        let mut out = String::new();
        Self::collect(&value, &mut out);
        Ok(tidy_whitespace(&out))
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["application/json"]
    }
}

/// Built-in readers selectable from configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    Plain,
    Html,
    Xml,
    Json,
}

impl ReaderKind {
    pub const ALL: [ReaderKind; 4] = [
        ReaderKind::Plain,
        ReaderKind::Html,
        ReaderKind::Xml,
        ReaderKind::Json,
    ];

    pub fn reader(self) -> Arc<dyn Reader> {
        match self {
            ReaderKind::Plain => Arc::new(PlainTextReader),
            ReaderKind::Html => Arc::new(HtmlReader),
            ReaderKind::Xml => Arc::new(XmlReader),
            ReaderKind::Json => Arc::new(JsonReader),
        }
    }
}

/// Content type to reader table.
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn Reader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in reader.
    pub fn with_defaults() -> Self {
        Self::from_kinds(&ReaderKind::ALL)
    }

    pub fn from_kinds(kinds: &[ReaderKind]) -> Self {
        let mut registry = Self::new();
        for kind in kinds {
            registry.register(kind.reader());
        }
        registry
    }

    /// Register `reader` for every content type it declares. A later reader
    /// replaces an earlier one for the same type.
    pub fn register(&mut self, reader: Arc<dyn Reader>) {
        for content_type in reader.content_types() {
            self.readers
                .insert(normalize_content_type(content_type), Arc::clone(&reader));
        }
    }

    pub fn resolve(&self, content_type: &str) -> Option<Arc<dyn Reader>> {
        self.readers.get(&normalize_content_type(content_type)).cloned()
    }

    /// Supported content types, sorted.
    pub fn content_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.readers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_are_normalized() {
        assert_eq!(normalize_content_type("Text/HTML; charset=UTF-8"), "text/html");
        assert_eq!(normalize_content_type("  application/json "), "application/json");
        assert_eq!(normalize_content_type(""), "");
    }

    #[test]
    fn plain_rejects_invalid_utf8() {
        assert_eq!(PlainTextReader.read(b"plain words").unwrap(), "plain words");
        assert!(matches!(
            PlainTextReader.read(&[0xff, 0xfe]),
            Err(ReadError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn html_skips_scripts_and_splits_blocks() {
        let html = br#"<html><head><title>Ignored head</title><style>p{}</style></head>
            <body><h1>Argus</h1><p>Panoptes was a <b>giant</b>.</p>
            <script>var watched = true;</script><div>Hundred eyes</div></body></html>"#;
        let text = HtmlReader.read(html).unwrap();
        assert_eq!(text, "Argus\nPanoptes was a giant.\nHundred eyes");
    }

    #[test]
    fn xml_collects_text_and_cdata() {
        let xml = br#"<?xml version="1.0"?>
            <rss><channel><item><title>Argus &amp; Io</title>
            <description><![CDATA[The <i>watchman</i>]]></description></item></channel></rss>"#;
        let text = XmlReader.read(xml).unwrap();
        assert_eq!(text, "Argus & Io\nThe <i>watchman</i>");
    }

    #[test]
    fn xml_reports_malformed_input() {
        let err = XmlReader.read(b"<a><b></a>").unwrap_err();
        assert!(matches!(err, ReadError::Malformed { .. }));
    }

    #[test]
    fn json_collects_strings_in_order() {
        let json = br#"{"title": "Argus", "tags": ["giant", 100, {"note": "eyes"}], "ok": true}"#;
        assert_eq!(JsonReader.read(json).unwrap(), "Argus\ngiant\neyes");
    }

    #[test]
    fn registry_resolves_by_normalized_type() {
        let registry = ReaderRegistry::from_kinds(&[ReaderKind::Plain, ReaderKind::Html]);
        assert!(registry.resolve("TEXT/HTML; charset=utf-8").is_some());
        assert!(registry.resolve("text/plain").is_some());
        assert!(registry.resolve("application/json").is_none());
        assert_eq!(
            registry.content_types(),
            vec!["application/xhtml+xml", "text/html", "text/plain"]
        );
    }
}
