//! Argus difference layer.
//!
//! Compares two snapshots of a watched resource and reports what changed as
//! merged runs of tokens. Each [`Difference`] carries the exact source span,
//! the normalized terms the keyword matcher works on, and a handle on its
//! snapshot's text so [`Difference::snippet`] can show surrounding context.
//!
//! ```
//! use std::sync::Arc;
//! use canonical::{Parser, ParseOptions};
//! use chrono::Utc;
//! use diff::{detect, DiffEvent};
//! use ingest::Document;
//!
//! fn snapshot(text: &str) -> Document {
//!     Document {
//!         url: "mem://fable".into(),
//!         content_type: "text/plain".into(),
//!         fetched_at: Utc::now(),
//!         language: "en".into(),
//!         raw_text: Arc::from(text),
//!         occurrences: Parser::new().parse(text, None, None, false),
//!         options: ParseOptions::verbatim(),
//!     }
//! }
//!
//! let diffs = detect(&snapshot("the cat sat"), &snapshot("the dog sat"));
//! assert_eq!(diffs.len(), 2);
//! assert_eq!((diffs[0].event, diffs[0].text.as_str()), (DiffEvent::Deleted, "cat"));
//! assert_eq!((diffs[1].event, diffs[1].text.as_str()), (DiffEvent::Inserted, "dog"));
//! assert_eq!(diffs[1].snippet(4), "the dog sat");
//! ```

mod detector;
mod difference;

pub use crate::detector::detect;
pub use crate::difference::{DiffEvent, Difference};
