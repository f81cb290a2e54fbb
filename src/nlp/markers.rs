//! Inline `$...$` entity markers embedded in normalized text.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// Delimiter wrapped around entity mentions.
pub const MARKER_DELIMITER: char = '$';

/// Non-overlapping marker scan; the capture is the raw entity text.
pub(crate) static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([^$]+)\$").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Wrap an entity mention as ` $text$ `, collapsing inner whitespace runs.
///
/// Returns `None` when nothing is left once delimiter characters are removed.
pub fn wrap_entity(text: &str) -> Option<String> {
    let cleaned = strip_delimiters(text);
    if cleaned.is_empty() {
        return None;
    }
    let collapsed = WHITESPACE.replace_all(&cleaned, " ");
    Some(format!(" {MARKER_DELIMITER}{collapsed}{MARKER_DELIMITER} "))
}

/// Number of markers in a phrase.
pub fn count_markers(phrase: &str) -> usize {
    MARKER.find_iter(phrase).count()
}

/// Byte ranges covered by markers, delimiters included.
pub(crate) fn marker_spans(text: &str) -> Vec<Range<usize>> {
    MARKER.find_iter(text).map(|m| m.range()).collect()
}

/// Remove every delimiter character.
pub fn strip_delimiters(text: &str) -> String {
    text.replace(MARKER_DELIMITER, "")
}

/// A phrase split into its entity names and the marker-free text used inside prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedPhrase {
    pub cleaned: String,
    pub entities: Vec<String>,
}

impl MarkedPhrase {
    pub fn parse(phrase: &str) -> Self {
        let entities = MARKER
            .captures_iter(phrase)
            .filter_map(|caps| caps.get(1))
            .map(|name| name.as_str().trim().to_string())
            .collect();
        Self {
            cleaned: strip_delimiters(phrase),
            entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_and_collapses() {
        assert_eq!(wrap_entity("Juan\n  Pérez").as_deref(), Some(" $Juan Pérez$ "));
        assert_eq!(wrap_entity("$"), None);
    }

    #[test]
    fn parses_names_in_order() {
        let parsed = MarkedPhrase::parse("$ Juan $ visitó $Madrid$ en 1920.");
        assert_eq!(parsed.entities, vec!["Juan", "Madrid"]);
        assert_eq!(parsed.cleaned, " Juan  visitó Madrid en 1920.");
        assert_eq!(count_markers("$ Juan $ visitó $Madrid$ en 1920."), 2);
    }

    #[test]
    fn empty_delimiter_pairs_are_not_markers() {
        assert_eq!(count_markers("precio $$ final"), 0);
    }
}
