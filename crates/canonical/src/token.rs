use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::language::{Stemmer, Stopper};

/// A kept token with its UTF-8 byte offsets and its position in the filtered
/// token sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Occurrence {
    /// Normalized token text (folded and stemmed as requested).
    pub text: String,
    /// Byte offset (inclusive) in the parsed text.
    pub start: usize,
    /// Byte offset (exclusive) in the parsed text.
    pub end: usize,
    /// Sequential index among kept tokens. Dropped tokens do not consume one.
    pub word_index: usize,
}

impl AsRef<str> for Occurrence {
    fn as_ref(&self) -> &str {
        self.text.as_str()
    }
}

/// Splits text into [`Occurrence`]s.
///
/// A parser owns a scratch buffer reused across calls, which is why it is
/// handed out by the [`ParserPool`](crate::ParserPool) rather than created per
/// document. The buffer never escapes; every occurrence owns its text.
#[derive(Debug, Default)]
pub struct Parser {
    scratch: String,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `text` on whitespace.
    ///
    /// Each candidate is trimmed of control characters and lower-cased when
    /// `ignore_case` is set. Empty candidates and stopwords are dropped without
    /// consuming a `word_index`. The stopword test always sees a lower-cased
    /// form; when case is kept only a scratch copy is folded. Survivors are
    /// stemmed when a stemmer is given. Offsets always point at the token in
    /// `text`, never at the stemmed form.
    pub fn parse(
        &mut self,
        text: &str,
        stopper: Option<&dyn Stopper>,
        stemmer: Option<&dyn Stemmer>,
        ignore_case: bool,
    ) -> Vec<Occurrence> {
        let mut occurrences = Vec::new();
        let mut start: Option<usize> = None;

        for (idx, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if let Some(token_start) = start.take() {
                    self.push_token(
                        text,
                        token_start..idx,
                        stopper,
                        stemmer,
                        ignore_case,
                        &mut occurrences,
                    );
                }
            } else if start.is_none() {
                start = Some(idx);
            }
        }

        if let Some(token_start) = start {
            self.push_token(
                text,
                token_start..text.len(),
                stopper,
                stemmer,
                ignore_case,
                &mut occurrences,
            );
        }

        occurrences
    }

    fn push_token(
        &mut self,
        text: &str,
        span: Range<usize>,
        stopper: Option<&dyn Stopper>,
        stemmer: Option<&dyn Stemmer>,
        ignore_case: bool,
        out: &mut Vec<Occurrence>,
    ) {
        let raw = &text[span.clone()];
        let trimmed = raw.trim_matches(char::is_control);
        if trimmed.is_empty() {
            return;
        }
        let lead = trimmed.as_ptr() as usize - raw.as_ptr() as usize;
        let start = span.start + lead;
        let end = start + trimmed.len();

        self.scratch.clear();
        if ignore_case || stopper.is_some() {
            self.scratch.extend(trimmed.chars().flat_map(char::to_lowercase));
        }

        if let Some(stopper) = stopper {
            if stopper.is_stopword(&self.scratch) {
                return;
            }
        }

        let token: &str = if ignore_case { &self.scratch } else { trimmed };
        let normalized = match stemmer {
            Some(stemmer) => stemmer.stem(token).into_owned(),
            None => token.to_string(),
        };

        out.push(Occurrence {
            text: normalized,
            start,
            end,
            word_index: out.len(),
        });
    }
}
