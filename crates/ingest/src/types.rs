use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use canonical::{Occurrence, ParseOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a watched resource: two documents are snapshots of the same
/// resource iff url and content type agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub url: String,
    pub content_type: String,
}

impl ResourceKey {
    pub fn new(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.content_type)
    }
}

/// An immutable snapshot of one fetch of a watched resource.
///
/// `occurrences` point into `raw_text`, the reader's output before cleaning,
/// so any span can be shown to a subscriber with its original punctuation and
/// accents. Snapshots are never mutated, only replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    /// Resolved content type, normalized.
    pub content_type: String,
    pub fetched_at: DateTime<Utc>,
    pub language: String,
    pub raw_text: Arc<str>,
    pub occurrences: Vec<Occurrence>,
    /// Options the occurrences were produced with.
    pub options: ParseOptions,
}

impl Document {
    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey::new(&self.url, &self.content_type)
    }

    /// Source text of one occurrence.
    pub fn span_text(&self, occurrence: &Occurrence) -> &str {
        self.raw_text
            .get(occurrence.start..occurrence.end)
            .unwrap_or_default()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.occurrences.iter().map(|o| o.text.as_str())
    }
}

/// Maximum number of non-matching tokens tolerated between consecutive
/// keyword terms.
///
/// Serialized as a number, or as the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SlopRepr", into = "SlopRepr")]
pub enum Slop {
    Exact(u32),
    Unlimited,
}

impl Slop {
    /// True if `gap` skipped tokens are tolerated.
    pub fn allows(self, gap: usize) -> bool {
        match self {
            Slop::Exact(limit) => gap <= limit as usize,
            Slop::Unlimited => true,
        }
    }
}

impl Default for Slop {
    fn default() -> Self {
        Slop::Exact(0)
    }
}

impl fmt::Display for Slop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slop::Exact(limit) => write!(f, "{limit}"),
            Slop::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SlopRepr {
    Count(u32),
    Word(String),
}

impl TryFrom<SlopRepr> for Slop {
    type Error = String;

    fn try_from(value: SlopRepr) -> Result<Self, Self::Error> {
        match value {
            SlopRepr::Count(limit) => Ok(Slop::Exact(limit)),
            SlopRepr::Word(word) if word.eq_ignore_ascii_case("unlimited") => Ok(Slop::Unlimited),
            SlopRepr::Word(word) => Err(format!(
                "slop must be a non-negative integer or \"unlimited\", got {word:?}"
            )),
        }
    }
}

impl From<Slop> for SlopRepr {
    fn from(value: Slop) -> Self {
        match value {
            Slop::Exact(limit) => SlopRepr::Count(limit),
            Slop::Unlimited => SlopRepr::Word("unlimited".to_string()),
        }
    }
}

/// A subscriber phrase reduced to its ordered, unique terms.
///
/// Equality and hashing use `original_input` only: the phrase a subscriber
/// typed is the subscription key, whatever its tokenization yields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub original_input: String,
    pub terms: Vec<String>,
    pub slop: Slop,
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        self.original_input == other.original_input
    }
}

impl Eq for Keyword {}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.original_input.hash(state);
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original_input)
    }
}
