//! Argus text layer.
//!
//! Turns plain text into the ordered term occurrences every other stage works
//! on. Documents and keywords go through the same steps so their terms compare
//! equal:
//!
//! - [`clean`]: punctuation becomes whitespace, diacritics fold to base
//!   characters, and an offset map leads back to the source text
//! - [`LanguageResources`]: language detection plus the stopper and stemmer
//!   registered for each language code, with a default-language fallback
//! - [`Parser`]: whitespace tokenization with optional stopword filtering,
//!   stemming and case folding
//! - [`ParserPool`]: a fixed number of reusable parsers shared by every
//!   caller, bounding how much tokenization runs at once
//!
//! ## Invariants worth knowing
//!
//! - Cleaning and parsing are pure: no I/O, no clock, no locale
//! - Dropped tokens never consume a word index, so word indices are dense
//! - Occurrence offsets point into the text that was parsed, never at the
//!   stemmed form
//! - A wait on the pool ends with a parser or with [`PoolError::Cancelled`],
//!   never with a silent failure

mod config;
mod error;
mod language;
mod pipeline;
mod pool;
mod stopwords;
mod token;
mod whitespace;

pub use crate::config::ParseOptions;
pub use crate::error::{LanguageError, PoolError};
pub use crate::language::{
    LanguageDetector, LanguageResources, SnowballStemmer, Stemmer, Stopper,
    StopwordLanguageDetector, WordListStopper, DEFAULT_LANGUAGE,
};
pub use crate::pipeline::{clean, CleanedText};
pub use crate::pool::{ParserPool, PooledParser};
pub use crate::token::{Occurrence, Parser};
pub use crate::whitespace::tidy_whitespace;

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> LanguageResources {
        LanguageResources::builtin(&["en"], DEFAULT_LANGUAGE).expect("english resources")
    }

    #[tokio::test]
    async fn clean_then_parse_through_pool() {
        let resources = english();
        let pool = ParserPool::new(1);
        let cleaned = clean("Argus Panoptes, the all-seeing giant!");

        let stopper = resources.stopper("en");
        let mut parser = pool.acquire().await.expect("parser");
        let out = parser.parse(&cleaned.text, stopper.as_deref(), None, true);

        let terms: Vec<&str> = out.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(terms, vec!["argus", "panoptes", "seeing", "giant"]);
    }

    #[test]
    fn folded_and_unfolded_spellings_agree() {
        let resources = english();
        let stopper = resources.stopper("en");
        let mut parser = Parser::new();

        let a = parser.parse(&clean("Café Crème").text, stopper.as_deref(), None, true);
        let b = parser.parse(&clean("cafe creme").text, stopper.as_deref(), None, true);
        let a: Vec<&str> = a.iter().map(|o| o.text.as_str()).collect();
        let b: Vec<&str> = b.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(a, vec!["cafe", "creme"]);
        assert_eq!(a, b);
    }

    #[test]
    fn occurrence_offsets_remap_to_source() {
        let source = "Über-naïve: yes";
        let cleaned = clean(source);
        let out = Parser::new().parse(&cleaned.text, None, None, true);

        let spans: Vec<&str> = out
            .iter()
            .map(|o| &source[cleaned.source_offset(o.start)..cleaned.source_offset(o.end)])
            .collect();
        assert_eq!(spans, vec!["Über", "naïve", "yes"]);
        assert_eq!(out[0].text, "uber");
    }
}
