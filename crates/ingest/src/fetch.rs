//! Transport: getting document bytes and their content type.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FetchError;
use crate::reader::normalize_content_type;

/// Raw result of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub body: Bytes,
    /// Content type reported by the transport, normalized. `None` when the
    /// transport did not say.
    pub content_type: Option<String>,
}

/// Retrieves a document. `content_type_hint` is what the subscriber asked for
/// and may be sent as `Accept`; the returned type is what the source claims.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        content_type_hint: Option<&str>,
    ) -> Result<FetchedContent, FetchError>;
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_user_agent() -> String {
    concat!("argus/", env!("CARGO_PKG_VERSION")).to_string()
}

/// [`Fetcher`] over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| FetchError::Setup(err.to_string()))?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        content_type_hint: Option<&str>,
    ) -> Result<FetchedContent, FetchError> {
        let transport = |err: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let mut request = self.client.get(url);
        if let Some(hint) = content_type_hint {
            request = request.header(reqwest::header::ACCEPT, hint);
        }
        let mut response = request.send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(normalize_content_type)
            .filter(|ct| !ct.is_empty());

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), content_type = ?content_type, "document_fetched");
        Ok(FetchedContent {
            body: body.freeze(),
            content_type,
        })
    }
}

/// [`Fetcher`] serving documents from memory.
///
/// Useful for demos and tests: contents can be swapped between ticks, and an
/// unknown URL answers like a missing page (status 404).
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: RwLock<HashMap<String, FetchedContent>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`. A `None` content type lets the caller's hint win.
    pub fn set(&self, url: impl Into<String>, content_type: Option<&str>, body: impl Into<Bytes>) {
        let content = FetchedContent {
            body: body.into(),
            content_type: content_type.map(normalize_content_type),
        };
        self.write().insert(url.into(), content);
    }

    pub fn remove(&self, url: &str) -> bool {
        self.write().remove(url).is_some()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, FetchedContent>> {
        self.documents
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(
        &self,
        url: &str,
        _content_type_hint: Option<&str>,
    ) -> Result<FetchedContent, FetchError> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        documents.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}
