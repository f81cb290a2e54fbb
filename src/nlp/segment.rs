//! Paragraph extraction, text normalization and phrase splitting for TEI documents.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::tei::{Element, TeiDocument, TEI_NAMESPACE},
    nlp::markers,
};

static SPACED_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+-").expect("valid regex"));
static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]()]").expect("valid regex"));
static COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s?").expect("valid regex"));
static SPACED_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r" , ").expect("valid regex"));
static SCENE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\* +").expect("valid regex"));
static EDITORIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\S+\]").expect("valid regex"));

/// Which elements count as sections, paragraphs and entity mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    pub namespace: String,
    pub section_tag: String,
    pub paragraph_tags: Vec<String>,
    pub entity_tags: Vec<String>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self::tei(TEI_NAMESPACE)
    }
}

impl SegmenterConfig {
    /// TEI layout: `div` sections holding `p`/`pb` paragraphs with named-entity children.
    pub fn tei(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            section_tag: "div".into(),
            paragraph_tags: vec!["pb".into(), "p".into()],
            entity_tags: ["persName", "orgName", "placeName", "date", "rs", "fw"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    fn is_section(&self, element: &Element) -> bool {
        element.is(&self.namespace, &self.section_tag)
    }

    fn is_paragraph(&self, element: &Element) -> bool {
        self.paragraph_tags
            .iter()
            .any(|tag| element.is(&self.namespace, tag))
    }

    fn is_entity(&self, element: &Element) -> bool {
        self.entity_tags
            .iter()
            .any(|tag| element.is(&self.namespace, tag))
    }
}

/// Turns a document into phrase candidates.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Extract, normalize and split the document text. An empty vector means the
    /// document has no qualifying section or paragraph.
    pub fn segment(&self, document: &TeiDocument) -> Vec<String> {
        let buffer = self.marked_text(document);
        if buffer.is_empty() {
            debug!("no qualifying paragraphs found");
            return Vec::new();
        }
        split_phrases(&normalize(&buffer))
    }

    /// Concatenated paragraph text of every section with entities wrapped in markers.
    pub fn marked_text(&self, document: &TeiDocument) -> String {
        let mut buffer = String::new();
        for section in document.elements().filter(|e| self.config.is_section(e)) {
            for paragraph in &section.children {
                if !self.config.is_paragraph(paragraph) {
                    continue;
                }
                let Some(opening) = paragraph.text.as_deref() else {
                    continue;
                };
                push_plain(&mut buffer, opening);
                for child in &paragraph.children {
                    if self.config.is_entity(child) {
                        if let Some(marker) = child.text.as_deref().and_then(markers::wrap_entity) {
                            buffer.push_str(&marker);
                        }
                    }
                    if let Some(tail) = child.tail.as_deref() {
                        push_plain(&mut buffer, tail);
                    }
                }
                if let Some(tail) = paragraph.tail.as_deref() {
                    push_plain(&mut buffer, tail);
                }
            }
        }
        buffer
    }
}

/// Segment with the default TEI configuration.
pub fn segment(document: &TeiDocument) -> Vec<String> {
    Segmenter::default().segment(document)
}

// The marker delimiter is reserved: stray occurrences in running text would pair
// up with real markers.
fn push_plain(buffer: &mut String, text: &str) {
    buffer.extend(text.chars().filter(|c| *c != markers::MARKER_DELIMITER));
}

/// Clean line-wrap and editorial artefacts from the running text.
pub fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = SPACED_HYPHEN.replace_all(&collapsed, "");
    let text = BRACKETS.replace_all(&text, "");
    let text = COLON.replace_all(&text, ": ");
    let text = SPACED_COMMA.replace_all(&text, ", ");
    let text = SCENE_BREAK.replace_all(&text, "");
    EDITORIAL.replace_all(&text, "").into_owned()
}

/// Split on `.` outside entity markers. Empty pieces are kept, so a text ending in
/// a period yields a trailing empty candidate.
pub fn split_phrases(text: &str) -> Vec<String> {
    let spans = markers::marker_spans(text);
    let mut spans = spans.iter().peekable();
    let mut phrases = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if ch != '.' {
            continue;
        }
        while spans.peek().is_some_and(|span| span.end <= idx) {
            spans.next();
        }
        if spans.peek().is_some_and(|span| span.start <= idx) {
            continue;
        }
        phrases.push(text[start..idx].to_string());
        start = idx + 1;
    }
    phrases.push(text[start..].to_string());
    phrases
}
