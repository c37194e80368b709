//! Wire shapes of the administrative requests.

use canonical::ParseOptions;
use ingest::{normalize_content_type, ResourceKey, Slop, FALLBACK_CONTENT_TYPE};
use matcher::EventFilter;
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Content type notifications are delivered as unless the client asks
/// otherwise.
pub const DEFAULT_CLIENT_CONTENT_TYPE: &str = "application/json";

/// Register a client's keywords against a watched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub document_url: String,
    #[serde(default)]
    pub document_content_type: Option<String>,
    pub client_url: String,
    #[serde(default)]
    pub client_content_type: Option<String>,
    pub keywords: Vec<String>,
    /// Seconds between detection ticks.
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub ignore_added: bool,
    #[serde(default)]
    pub ignore_removed: bool,
    #[serde(default = "default_true")]
    pub filter_stopwords: bool,
    #[serde(default)]
    pub enable_stemming: bool,
    #[serde(default = "default_true")]
    pub ignore_case: bool,
    /// Characters of context around each match, on each side.
    #[serde(default = "default_snippet_offset")]
    pub snippet_offset: usize,
    #[serde(default)]
    pub slop: Slop,
}

fn default_interval() -> u64 {
    300
}

fn default_snippet_offset() -> usize {
    40
}

fn default_true() -> bool {
    true
}

impl SubscribeRequest {
    /// A request with defaults for everything but the three required fields.
    pub fn new<I, S>(document_url: impl Into<String>, client_url: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            document_url: document_url.into(),
            document_content_type: None,
            client_url: client_url.into(),
            client_content_type: None,
            keywords: keywords.into_iter().map(Into::into).collect(),
            interval: default_interval(),
            ignore_added: false,
            ignore_removed: false,
            filter_stopwords: true,
            enable_stemming: false,
            ignore_case: true,
            snippet_offset: default_snippet_offset(),
            slop: Slop::default(),
        }
    }

    pub fn document_key(&self) -> ResourceKey {
        document_key(&self.document_url, self.document_content_type.as_deref())
    }

    pub fn client_key(&self) -> ResourceKey {
        client_key(&self.client_url, self.client_content_type.as_deref())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            filter_stopwords: self.filter_stopwords,
            enable_stemming: self.enable_stemming,
            ignore_case: self.ignore_case,
        }
    }

    pub fn event_filter(&self) -> EventFilter {
        EventFilter::new(self.ignore_added, self.ignore_removed)
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.document_url.trim().is_empty() {
            return Err(JobError::InvalidRequest("documentUrl must not be empty".into()));
        }
        if self.client_url.trim().is_empty() {
            return Err(JobError::InvalidRequest("clientUrl must not be empty".into()));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(JobError::InvalidRequest(
                "at least one non-empty keyword is required".into(),
            ));
        }
        if self.interval == 0 {
            return Err(JobError::InvalidRequest("interval must be >= 1 second".into()));
        }
        Ok(())
    }
}

/// Remove one client's subscription to a watched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub document_url: String,
    #[serde(default)]
    pub document_content_type: Option<String>,
    pub client_url: String,
    #[serde(default)]
    pub client_content_type: Option<String>,
}

impl CancelRequest {
    pub fn new(document_url: impl Into<String>, client_url: impl Into<String>) -> Self {
        Self {
            document_url: document_url.into(),
            document_content_type: None,
            client_url: client_url.into(),
            client_content_type: None,
        }
    }

    pub fn document_key(&self) -> ResourceKey {
        document_key(&self.document_url, self.document_content_type.as_deref())
    }
}

impl From<&SubscribeRequest> for CancelRequest {
    fn from(request: &SubscribeRequest) -> Self {
        Self {
            document_url: request.document_url.clone(),
            document_content_type: request.document_content_type.clone(),
            client_url: request.client_url.clone(),
            client_content_type: request.client_content_type.clone(),
        }
    }
}

fn document_key(url: &str, content_type: Option<&str>) -> ResourceKey {
    ResourceKey::new(url.trim(), resolve(content_type, FALLBACK_CONTENT_TYPE))
}

fn client_key(url: &str, content_type: Option<&str>) -> ResourceKey {
    ResourceKey::new(url.trim(), resolve(content_type, DEFAULT_CLIENT_CONTENT_TYPE))
}

fn resolve(content_type: Option<&str>, fallback: &str) -> String {
    content_type
        .map(normalize_content_type)
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
