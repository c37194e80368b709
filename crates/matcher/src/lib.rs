//! # Argus Matcher (`matcher`)
//!
//! Decides which [`Difference`](diff::Difference)s satisfy a subscriber's
//! [`Keyword`](ingest::Keyword).
//!
//! A keyword matches when all of its terms occur, in order, among the terms
//! of one difference with at most `slop` other terms between any two
//! consecutive keyword terms. `Slop::Exact(0)` asks for the exact phrase;
//! `Slop::Unlimited` only for the right relative order. Whole event
//! categories can be excluded with an [`EventFilter`] before any matching is
//! attempted.
//!
//! ```
//! use ingest::{Keyword, Slop};
//! use matcher::matches_terms;
//!
//! let keyword = Keyword {
//!     original_input: "argus panoptes".into(),
//!     terms: vec!["argus".into(), "panoptes".into()],
//!     slop: Slop::Exact(1),
//! };
//! assert!(matches_terms(&keyword.terms, &["argus", "is", "panoptes"], keyword.slop));
//! assert!(!matches_terms(&keyword.terms, &["panoptes", "argus"], keyword.slop));
//! ```

mod engine;
mod types;

pub use crate::engine::{find_all_matches, find_matches, matches_terms};
pub use crate::types::{EventFilter, Match};
