//! Error types produced by the ingest crate.
//!
//! Fetching and reading are kept apart from building so callers can tell a
//! network problem from a document that arrived but could not be understood.
//! Every variant is cloneable and comparable, which keeps test assertions
//! simple and lets the job manager log the same error in several places.
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | [`FetchError`] | [`Fetcher`](crate::Fetcher) | transport failure, bad status, oversized body |
//! | [`ReadError`] | [`Reader`](crate::Reader) | bytes could not be turned into text |
//! | [`BuildError`] | builders | any of the above, a cancelled pool wait, or an empty keyword |

use canonical::PoolError;
use thiserror::Error;

/// Failures while retrieving a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The body exceeded the configured size cap.
    #[error("body of {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    /// The fetcher could not be constructed.
    #[error("fetcher setup failed: {0}")]
    Setup(String),
}

/// Failures while turning fetched bytes into plain text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReadError {
    #[error("content is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("malformed {content_type} content: {message}")]
    Malformed {
        content_type: String,
        message: String,
    },
}

/// Failures of the document and keyword builders.
///
/// A builder never returns a partial result: any error here means "no
/// document this time". Fetch, read and content-type errors are retryable on
/// the next tick; [`Cancelled`](BuildError::Cancelled) means the parser pool
/// was shut down while waiting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("no reader registered for content type {0}")]
    UnsupportedContentType(String),

    #[error("tokenization cancelled")]
    Cancelled,

    /// Every term of the phrase was filtered out.
    #[error("keyword {0:?} has no terms left after filtering")]
    EmptyKeyword(String),
}

impl BuildError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

impl From<PoolError> for BuildError {
    fn from(value: PoolError) -> Self {
        match value {
            PoolError::Cancelled => BuildError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_cancellation_maps_to_cancelled() {
        let err: BuildError = PoolError::Cancelled.into();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "tokenization cancelled");
    }

    #[test]
    fn fetch_errors_stay_transparent() {
        let err: BuildError = FetchError::Status {
            url: "https://example.org".into(),
            status: 503,
        }
        .into();
        assert_eq!(err.to_string(), "unexpected status 503 for https://example.org");
        assert!(!err.is_cancelled());
    }
}
