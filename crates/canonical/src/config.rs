//! Parse options shared by documents and keywords.
//!
//! [`ParseOptions`] carries the three subscriber-level switches that change
//! how text turns into terms. Two token streams are only comparable when they
//! were produced with the same options, which is why the type is `Hash + Eq`:
//! callers key snapshots by it.
//!
//! # Examples
//!
//! ```rust
//! use canonical::ParseOptions;
//!
//! let options = ParseOptions::default();
//! assert!(options.filter_stopwords);
//! assert!(!options.enable_stemming);
//! assert!(options.ignore_case);
//! ```

use serde::{Deserialize, Serialize};

/// Switches applied by [`Parser::parse`](crate::Parser::parse) through the
/// builders.
///
/// # Fields
///
/// - `filter_stopwords`: drop tokens the language's stopper reports
/// - `enable_stemming`: reduce surviving tokens with the language's stemmer
/// - `ignore_case`: lower-case tokens before storing them
///
/// # Serialization
///
/// ```json
/// {
///   "filter_stopwords": true,
///   "enable_stemming": false,
///   "ignore_case": true
/// }
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ParseOptions {
    /// If true, tokens reported by the stopper are removed from the stream and
    /// do not consume a word index.
    #[serde(default = "default_true")]
    pub filter_stopwords: bool,

    /// If true, surviving tokens are stemmed in place.
    ///
    /// Stemming happens after the stopword test, so a stopword never reaches
    /// the stemmer.
    #[serde(default)]
    pub enable_stemming: bool,

    /// If true, tokens are lower-cased.
    ///
    /// The stopword test always runs on a lower-cased copy; this switch only
    /// decides whether the stored token is folded as well.
    #[serde(default = "default_true")]
    pub ignore_case: bool,
}

impl ParseOptions {
    /// Options that keep every token verbatim.
    pub fn verbatim() -> Self {
        Self {
            filter_stopwords: false,
            enable_stemming: false,
            ignore_case: false,
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            filter_stopwords: true,
            enable_stemming: false,
            ignore_case: true,
        }
    }
}

fn default_true() -> bool {
    true
}
