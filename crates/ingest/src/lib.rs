//! Argus ingest layer.
//!
//! This is where watched content enters Argus. A URL is fetched, its bytes are
//! read into plain text by the reader registered for its content type, and the
//! text is tokenized into an immutable [`Document`] snapshot. Subscriber
//! phrases take the same text pipeline minus the fetch and become
//! [`Keyword`]s, so document terms and keyword terms compare directly.
//!
//! ## What we do here
//!
//! - **Fetch**: [`Fetcher`] is the transport seam. [`HttpFetcher`] speaks
//!   HTTP(S) with a timeout and a body cap; [`MemoryFetcher`] serves from memory
//! - **Read**: [`ReaderRegistry`] maps a normalized content type to a
//!   [`Reader`] (plain text, HTML, XML feeds, JSON)
//! - **Tokenize**: [`TextPipeline`] cleans, detects the language, picks the
//!   stopper and stemmer, and parses with a pooled parser
//! - **Log everything**: builds emit `document_built` / `document_build_failure`
//!   events with `elapsed_micros`
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use canonical::{LanguageResources, ParseOptions, ParserPool};
//! use ingest::{DocumentBuilder, MemoryFetcher, ReaderRegistry, TextPipeline};
//!
//! # tokio_test_block(async {
//! let fetcher = Arc::new(MemoryFetcher::new());
//! fetcher.set("mem://io", Some("text/plain"), "Io was watched by Argus");
//!
//! let resources = LanguageResources::builtin(&["en"], "en").unwrap();
//! let pipeline = TextPipeline::new(Arc::new(resources), Arc::new(ParserPool::new(1)));
//! let builder = DocumentBuilder::new(fetcher, Arc::new(ReaderRegistry::with_defaults()), pipeline);
//!
//! let document = builder.build("mem://io", None, ParseOptions::default()).await.unwrap();
//! assert_eq!(document.terms().collect::<Vec<_>>(), vec!["io", "watched", "argus"]);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod builder;
mod error;
mod fetch;
mod reader;
mod types;

pub use crate::builder::{
    DocumentBuilder, KeywordBuilder, PreparedText, ReadText, TextPipeline, FALLBACK_CONTENT_TYPE,
};
pub use crate::error::{BuildError, FetchError, ReadError};
pub use crate::fetch::{FetchConfig, FetchedContent, Fetcher, HttpFetcher, MemoryFetcher};
pub use crate::reader::{
    normalize_content_type, HtmlReader, JsonReader, PlainTextReader, Reader, ReaderKind,
    ReaderRegistry, XmlReader,
};
pub use crate::types::{Document, Keyword, ResourceKey, Slop};
