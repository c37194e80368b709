use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Which snapshot a run of tokens is missing from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DiffEvent {
    /// Present in the new snapshot only; anchored in the new text.
    Inserted,
    /// Present in the old snapshot only; anchored in the old text.
    Deleted,
}

impl DiffEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffEvent::Inserted => "inserted",
            DiffEvent::Deleted => "deleted",
        }
    }
}

impl fmt::Display for DiffEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A maximal run of tokens present in one snapshot and aligned to nothing in
/// the other.
///
/// `text` is the source span from the first token's start to the last token's
/// end, separators and punctuation included. `terms` are the normalized token
/// texts of the run, which is what keywords are matched against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Difference {
    pub event: DiffEvent,
    pub text: String,
    /// Byte offset (inclusive) in the anchoring snapshot's raw text.
    pub start: usize,
    /// Byte offset (exclusive) in the anchoring snapshot's raw text.
    pub end: usize,
    pub terms: Vec<String>,
    #[serde(skip, default = "empty_source")]
    source: Arc<str>,
}

fn empty_source() -> Arc<str> {
    Arc::from("")
}

impl Difference {
    pub(crate) fn new(
        event: DiffEvent,
        source: &Arc<str>,
        start: usize,
        end: usize,
        terms: Vec<String>,
    ) -> Self {
        Self {
            event,
            text: source.get(start..end).unwrap_or_default().to_string(),
            start,
            end,
            terms,
            source: Arc::clone(source),
        }
    }

    /// The run widened by up to `offset` characters of surrounding source
    /// text on each side.
    ///
    /// Clamped to the document bounds. A deserialized difference has lost its
    /// source and returns `text` unchanged.
    pub fn snippet(&self, offset: usize) -> &str {
        let source: &str = &self.source;
        if source.get(self.start..self.end).is_none() {
            return &self.text;
        }

        let start = source[..self.start]
            .char_indices()
            .rev()
            .take(offset)
            .last()
            .map_or(self.start, |(idx, _)| idx);
        let end = source[self.end..]
            .char_indices()
            .nth(offset)
            .map_or(source.len(), |(idx, _)| self.end + idx);

        &source[start..end]
    }
}
