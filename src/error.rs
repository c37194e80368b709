use ingest::{BuildError, FetchError, ResourceKey};
use thiserror::Error;

use crate::config::ConfigLoadError;

/// Errors returned by the job manager's administrative operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobError {
    #[error("{client_url} already subscribes to {document}")]
    Conflict {
        document: ResourceKey,
        client_url: String,
    },
    #[error("{client_url} has no subscription to {document}")]
    NotFound {
        document: ResourceKey,
        client_url: String,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("keyword processing failed: {0}")]
    Processing(#[source] BuildError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JobError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, JobError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, JobError::NotFound { .. })
    }
}

impl From<BuildError> for JobError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::EmptyKeyword(phrase) => {
                JobError::InvalidRequest(format!("keyword {phrase:?} has no terms left to match"))
            }
            other => JobError::Processing(other),
        }
    }
}

/// Errors raised by the persistence collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("poisoned lock in {0}")]
    Poisoned(&'static str),
}

/// Delivery failures of a notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotifyError {
    #[error("failed to reach {url}: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("delivery to {url} timed out")]
    Timeout { url: String },
    #[error("failed to encode notification: {0}")]
    Encode(String),
    #[error("notifier setup failed: {0}")]
    Setup(String),
}

/// Anything that can stop the service from starting.
#[derive(Debug, Error)]
pub enum ArgusError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Language(#[from] canonical::LanguageError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keyword_is_an_invalid_request() {
        let err = JobError::from(BuildError::EmptyKeyword("the".into()));
        assert!(matches!(err, JobError::InvalidRequest(_)));

        let err = JobError::from(BuildError::Cancelled);
        assert!(matches!(err, JobError::Processing(BuildError::Cancelled)));
    }

    #[test]
    fn conflict_message_names_both_sides() {
        let err = JobError::Conflict {
            document: ResourceKey::new("https://example.org/argus", "text/html"),
            client_url: "https://client.example/hook".into(),
        };
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "https://client.example/hook already subscribes to https://example.org/argus (text/html)"
        );
    }
}
