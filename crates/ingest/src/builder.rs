//! Document and keyword builders.
//!
//! Both run the same text pipeline so document terms and keyword terms are
//! directly comparable: clean, detect language, resolve the stopper and
//! stemmer for that language, then parse with a pooled parser.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use canonical::{clean, CleanedText, LanguageResources, Occurrence, ParseOptions, ParserPool};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::fetch::Fetcher;
use crate::reader::{normalize_content_type, ReaderRegistry};
use crate::types::{Document, Keyword, Slop};

/// Content type assumed when neither the transport nor the caller names one.
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain";

/// Cleaned text plus the language it was detected as.
#[derive(Debug, Clone)]
pub struct PreparedText {
    pub cleaned: CleanedText,
    pub language: String,
}

/// Shared clean → detect → parse stages.
#[derive(Debug, Clone)]
pub struct TextPipeline {
    resources: Arc<LanguageResources>,
    pool: Arc<ParserPool>,
}

impl TextPipeline {
    pub fn new(resources: Arc<LanguageResources>, pool: Arc<ParserPool>) -> Self {
        Self { resources, pool }
    }

    pub fn pool(&self) -> &Arc<ParserPool> {
        &self.pool
    }

    pub fn resources(&self) -> &Arc<LanguageResources> {
        &self.resources
    }

    /// Clean `text` and detect its language. Independent of parse options, so
    /// one preparation serves every option set.
    pub fn prepare(&self, text: &str) -> PreparedText {
        let cleaned = clean(text);
        let language = self.resources.detect_language(&cleaned.text);
        PreparedText { cleaned, language }
    }

    /// Parse prepared text. Offsets in the result point into the text given
    /// to [`prepare`](Self::prepare).
    ///
    /// Waits for a pooled parser; the parser goes back to the pool on every
    /// exit path.
    pub async fn tokenize(
        &self,
        prepared: &PreparedText,
        options: ParseOptions,
    ) -> Result<Vec<Occurrence>, BuildError> {
        let stopper = if options.filter_stopwords {
            self.resources.stopper(&prepared.language)
        } else {
            None
        };
        let stemmer = if options.enable_stemming {
            self.resources.stemmer(&prepared.language)
        } else {
            None
        };

        let mut occurrences = {
            let mut parser = self.pool.acquire().await?;
            parser.parse(
                &prepared.cleaned.text,
                stopper.as_deref(),
                stemmer.as_deref(),
                options.ignore_case,
            )
        };

        for occurrence in &mut occurrences {
            occurrence.start = prepared.cleaned.source_offset(occurrence.start);
            occurrence.end = prepared.cleaned.source_offset(occurrence.end);
        }
        Ok(occurrences)
    }
}

/// Text read from a fetched document, before tokenization.
#[derive(Debug, Clone)]
pub struct ReadText {
    pub url: String,
    pub content_type: String,
    pub text: Arc<str>,
}

/// Fetches, reads and tokenizes URLs into [`Document`] snapshots.
#[derive(Clone)]
pub struct DocumentBuilder {
    fetcher: Arc<dyn Fetcher>,
    readers: Arc<ReaderRegistry>,
    pipeline: TextPipeline,
}

impl DocumentBuilder {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        readers: Arc<ReaderRegistry>,
        pipeline: TextPipeline,
    ) -> Self {
        Self {
            fetcher,
            readers,
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &TextPipeline {
        &self.pipeline
    }

    /// Build one snapshot of `url` tokenized with `options`.
    pub async fn build(
        &self,
        url: &str,
        content_type_hint: Option<&str>,
        options: ParseOptions,
    ) -> Result<Document, BuildError> {
        let start = Instant::now();
        let result = async {
            let read = self.read(url, content_type_hint).await?;
            let prepared = self.pipeline.prepare(&read.text);
            self.snapshot(&read, &prepared, options, Utc::now()).await
        }
        .await;
        report(url, start, result.as_ref().map(std::slice::from_ref));
        result
    }

    /// Fetch `url` once and build one snapshot per option set, in the order
    /// given. Either every snapshot is built or none is.
    pub async fn build_variants(
        &self,
        url: &str,
        content_type_hint: Option<&str>,
        options: &[ParseOptions],
    ) -> Result<Vec<Document>, BuildError> {
        let start = Instant::now();
        let result = async {
            let read = self.read(url, content_type_hint).await?;
            let prepared = self.pipeline.prepare(&read.text);
            let fetched_at = Utc::now();
            let mut documents = Vec::with_capacity(options.len());
            for options in options {
                documents.push(self.snapshot(&read, &prepared, *options, fetched_at).await?);
            }
            Ok::<_, BuildError>(documents)
        }
        .await;
        report(url, start, result.as_ref().map(Vec::as_slice));
        result
    }

    async fn snapshot(
        &self,
        read: &ReadText,
        prepared: &PreparedText,
        options: ParseOptions,
        fetched_at: DateTime<Utc>,
    ) -> Result<Document, BuildError> {
        let occurrences = self.pipeline.tokenize(prepared, options).await?;
        Ok(Document {
            url: read.url.clone(),
            content_type: read.content_type.clone(),
            fetched_at,
            language: prepared.language.clone(),
            raw_text: Arc::clone(&read.text),
            occurrences,
            options,
        })
    }

    /// Fetch `url` and turn it into plain text.
    ///
    /// The content type reported by the transport wins over the hint; with
    /// neither, the document is read as [`FALLBACK_CONTENT_TYPE`].
    pub async fn read(
        &self,
        url: &str,
        content_type_hint: Option<&str>,
    ) -> Result<ReadText, BuildError> {
        let fetched = self.fetcher.fetch(url, content_type_hint).await?;
        let content_type = fetched
            .content_type
            .or_else(|| content_type_hint.map(normalize_content_type))
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        let reader = self
            .readers
            .resolve(&content_type)
            .ok_or_else(|| BuildError::UnsupportedContentType(content_type.clone()))?;
        let text = reader.read(&fetched.body)?;
        debug!(url, content_type = %content_type, chars = text.len(), "document_read");

        Ok(ReadText {
            url: url.to_string(),
            content_type,
            text: Arc::from(text),
        })
    }
}

fn report(url: &str, start: Instant, result: Result<&[Document], &BuildError>) {
    let elapsed_micros = start.elapsed().as_micros();
    match result {
        Ok(documents) => {
            let occurrences = documents.first().map_or(0, |d| d.occurrences.len());
            let language = documents.first().map_or("", |d| d.language.as_str());
            info!(
                url,
                language,
                variants = documents.len(),
                occurrences,
                elapsed_micros,
                "document_built"
            );
        }
        Err(err) => warn!(url, error = %err, elapsed_micros, "document_build_failure"),
    }
}

impl std::fmt::Debug for DocumentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentBuilder")
            .field("readers", &self.readers)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Turns subscriber phrases into [`Keyword`]s.
#[derive(Debug, Clone)]
pub struct KeywordBuilder {
    pipeline: TextPipeline,
}

impl KeywordBuilder {
    pub fn new(pipeline: TextPipeline) -> Self {
        Self { pipeline }
    }

    /// Tokenize `phrase` with `options` and keep the first occurrence of each
    /// term. A phrase with nothing left after filtering is rejected.
    pub async fn build(
        &self,
        phrase: &str,
        options: ParseOptions,
        slop: Slop,
    ) -> Result<Keyword, BuildError> {
        let prepared = self.pipeline.prepare(phrase);
        let occurrences = self.pipeline.tokenize(&prepared, options).await?;

        let mut seen = HashSet::with_capacity(occurrences.len());
        let terms: Vec<String> = occurrences
            .into_iter()
            .map(|o| o.text)
            .filter(|term| seen.insert(term.clone()))
            .collect();

        if terms.is_empty() {
            return Err(BuildError::EmptyKeyword(phrase.to_string()));
        }

        Ok(Keyword {
            original_input: phrase.to_string(),
            terms,
            slop,
        })
    }
}
