//! Language-aware resources: stoppers, stemmers and language detection.
//!
//! Everything here is resolved through an explicit table keyed by language
//! code. [`LanguageResources::builtin`] fills that table from the word lists and
//! Snowball algorithms shipped with the crate; callers can register their own
//! implementations with the `with_*` builders.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rust_stemmers::Algorithm;

use crate::error::LanguageError;
use crate::pipeline::clean;
use crate::stopwords;

/// Language used when detection is unavailable or yields nothing usable.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Decides whether a token carries no information for matching.
pub trait Stopper: Send + Sync {
    /// `word` is expected lower-cased; the parser folds before asking.
    fn is_stopword(&self, word: &str) -> bool;

    fn is_empty(&self) -> bool;
}

/// Reduces a token to its stem.
pub trait Stemmer: Send + Sync {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str>;

    /// Language code this stemmer was built for.
    fn language(&self) -> &str;
}

/// Guesses the language of a text.
pub trait LanguageDetector: Send + Sync {
    /// Returns `None` when the text gives no usable signal.
    fn detect(&self, text: &str) -> Option<String>;
}

/// Stopper backed by a fixed set of folded words.
#[derive(Debug, Clone, Default)]
pub struct WordListStopper {
    words: HashSet<String>,
}

impl WordListStopper {
    /// Build from arbitrary words. Each entry is cleaned and lower-cased so it
    /// compares equal to the tokens the parser produces.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| fold(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// The list shipped with the crate for `code`, if any.
    pub fn builtin(code: &str) -> Option<Self> {
        stopwords::builtin(code).map(|list| Self::from_words(list.iter().copied()))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

impl Stopper for WordListStopper {
    fn is_stopword(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Snowball stemmer from `rust-stemmers`.
pub struct SnowballStemmer {
    stemmer: rust_stemmers::Stemmer,
    algorithm: Algorithm,
    language: String,
}

impl SnowballStemmer {
    pub fn new(language: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            stemmer: rust_stemmers::Stemmer::create(algorithm),
            algorithm,
            language: language.into(),
        }
    }

    /// Snowball stemmer for a supported language code.
    pub fn for_language(code: &str) -> Option<Self> {
        snowball_algorithm(code).map(|algorithm| Self::new(code, algorithm))
    }
}

impl Clone for SnowballStemmer {
    fn clone(&self) -> Self {
        // rust_stemmers::Stemmer is not Clone; recreate it.
        Self::new(self.language.clone(), self.algorithm)
    }
}

impl fmt::Debug for SnowballStemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowballStemmer")
            .field("language", &self.language)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl Stemmer for SnowballStemmer {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        self.stemmer.stem(word)
    }

    fn language(&self) -> &str {
        &self.language
    }
}

fn snowball_algorithm(code: &str) -> Option<Algorithm> {
    let algorithm = match code {
        "en" => Algorithm::English,
        "de" => Algorithm::German,
        "fr" => Algorithm::French,
        "es" => Algorithm::Spanish,
        "it" => Algorithm::Italian,
        "pt" => Algorithm::Portuguese,
        "nl" => Algorithm::Dutch,
        _ => return None,
    };
    Some(algorithm)
}

/// Detects the language whose stopwords occur most often in a text.
///
/// Stopwords are the most frequent words of any language, which makes their
/// hit count a cheap and surprisingly reliable signal on prose. Texts with
/// fewer than `min_hits` stopwords of the best language, or where several
/// languages share the best score, are left undetected.
#[derive(Debug, Clone)]
pub struct StopwordLanguageDetector {
    languages: Vec<(String, WordListStopper)>,
    min_hits: usize,
}

impl StopwordLanguageDetector {
    pub const DEFAULT_MIN_HITS: usize = 2;

    pub fn new(mut languages: Vec<(String, WordListStopper)>) -> Self {
        languages.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            languages,
            min_hits: Self::DEFAULT_MIN_HITS,
        }
    }

    pub fn with_min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = min_hits;
        self
    }
}

impl LanguageDetector for StopwordLanguageDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let folded = fold(text);
        let mut scores = vec![0usize; self.languages.len()];
        for word in folded.split_whitespace() {
            for (score, (_, stopper)) in scores.iter_mut().zip(&self.languages) {
                if stopper.is_stopword(word) {
                    *score += 1;
                }
            }
        }

        let top = scores.iter().copied().max().unwrap_or(0);
        if top == 0 || top < self.min_hits {
            return None;
        }
        let mut leaders = scores.iter().enumerate().filter(|(_, score)| **score == top);
        match (leaders.next(), leaders.next()) {
            (Some((idx, _)), None) => Some(self.languages[idx].0.clone()),
            // A shared lead is no signal; the caller's default applies.
            _ => None,
        }
    }
}

/// Capability table: language code to stopper and stemmer, plus detection.
#[derive(Clone)]
pub struct LanguageResources {
    default_language: String,
    stoppers: HashMap<String, Arc<dyn Stopper>>,
    stemmers: HashMap<String, Arc<dyn Stemmer>>,
    detector: Option<Arc<dyn LanguageDetector>>,
}

impl LanguageResources {
    /// Empty table with no stoppers, stemmers or detector.
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            stoppers: HashMap::new(),
            stemmers: HashMap::new(),
            detector: None,
        }
    }

    /// Table populated from the built-in word lists and Snowball stemmers.
    ///
    /// Every code in `languages` must be supported, and `default_language`
    /// must be one of them. A [`StopwordLanguageDetector`] over the same word
    /// lists is installed.
    pub fn builtin<S: AsRef<str>>(
        languages: &[S],
        default_language: &str,
    ) -> Result<Self, LanguageError> {
        let mut resources = Self::new(default_language);
        let mut detector_lists = Vec::with_capacity(languages.len());

        for code in languages {
            let code = code.as_ref().trim().to_lowercase();
            let stopper = WordListStopper::builtin(&code)
                .ok_or_else(|| LanguageError::Unsupported(code.clone()))?;
            let stemmer = SnowballStemmer::for_language(&code)
                .ok_or_else(|| LanguageError::Unsupported(code.clone()))?;
            detector_lists.push((code.clone(), stopper.clone()));
            resources = resources
                .with_stopper(code.clone(), Arc::new(stopper))
                .with_stemmer(code, Arc::new(stemmer));
        }

        if !resources.supports(default_language) {
            return Err(LanguageError::MissingDefault(default_language.to_string()));
        }

        Ok(resources.with_detector(Arc::new(StopwordLanguageDetector::new(detector_lists))))
    }

    pub fn with_stopper(mut self, code: impl Into<String>, stopper: Arc<dyn Stopper>) -> Self {
        self.stoppers.insert(code.into(), stopper);
        self
    }

    pub fn with_stemmer(mut self, code: impl Into<String>, stemmer: Arc<dyn Stemmer>) -> Self {
        self.stemmers.insert(code.into(), stemmer);
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// True if a stopper or stemmer is registered for `code`.
    pub fn supports(&self, code: &str) -> bool {
        self.stoppers.contains_key(code) || self.stemmers.contains_key(code)
    }

    /// Registered language codes, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self
            .stoppers
            .keys()
            .chain(self.stemmers.keys())
            .map(String::as_str)
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }

    /// Detected language of `text`, or the default language when there is no
    /// detector, no signal, or no resources for the detected code.
    pub fn detect_language(&self, text: &str) -> String {
        self.detector
            .as_ref()
            .and_then(|detector| detector.detect(text))
            .filter(|code| self.supports(code))
            .unwrap_or_else(|| self.default_language.clone())
    }

    /// Stopper for `code`, falling back to the default language's.
    pub fn stopper(&self, code: &str) -> Option<Arc<dyn Stopper>> {
        self.stoppers
            .get(code)
            .or_else(|| self.stoppers.get(&self.default_language))
            .cloned()
    }

    /// Stemmer for `code`, falling back to the default language's.
    pub fn stemmer(&self, code: &str) -> Option<Arc<dyn Stemmer>> {
        self.stemmers
            .get(code)
            .or_else(|| self.stemmers.get(&self.default_language))
            .cloned()
    }
}

impl fmt::Debug for LanguageResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageResources")
            .field("default_language", &self.default_language)
            .field("languages", &self.languages())
            .field("detector", &self.detector.is_some())
            .finish()
    }
}

fn fold(text: &str) -> String {
    clean(text).text.trim().to_lowercase()
}
