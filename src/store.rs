//! Persistence collaborators of the job manager.
//!
//! The traits are synchronous; the manager never holds a store call across an
//! await point. The in-memory implementations keep everything behind a
//! `RwLock<HashMap<..>>`.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use canonical::ParseOptions;
use chrono::{DateTime, Utc};
use diff::Difference;
use ingest::{Document, ResourceKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Last snapshot of each watched document, one per parse option set.
pub trait DocumentStore: Send + Sync {
    fn get(&self, key: &ResourceKey, options: ParseOptions) -> Result<Option<Document>, StoreError>;

    /// Store `document` as the snapshot of `key` for its own parse options.
    fn put(&self, key: &ResourceKey, document: Document) -> Result<(), StoreError>;

    /// Drop every snapshot of `key`.
    fn remove(&self, key: &ResourceKey) -> Result<(), StoreError>;
}

/// Differences found by one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub detected_at: DateTime<Utc>,
    pub differences: Vec<Difference>,
}

/// Recent tick results per watched document.
pub trait DiffStore: Send + Sync {
    fn add_differences(
        &self,
        key: &ResourceKey,
        differences: Vec<Difference>,
    ) -> Result<(), StoreError>;

    /// Oldest first.
    fn get_differences(&self, key: &ResourceKey) -> Result<Vec<DiffRecord>, StoreError>;

    fn remove_differences(&self, key: &ResourceKey) -> Result<(), StoreError>;
}

/// A client's delivery session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    pub token: Uuid,
    /// Callback url and the content type it accepts.
    pub client: ResourceKey,
}

/// Sessions keyed by `(client_url, client_content_type)`.
pub trait SessionStore: Send + Sync {
    /// The client's session, created on first use.
    fn add(&self, client: &ResourceKey) -> Result<Session, StoreError>;

    fn validate_token(&self, client: &ResourceKey, token: Uuid) -> Result<bool, StoreError>;

    /// True if a session was removed.
    fn remove_session(&self, client: &ResourceKey) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<ResourceKey, HashMap<ParseOptions, Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, key: &ResourceKey, options: ParseOptions) -> Result<Option<Document>, StoreError> {
        let guard = self
            .documents
            .read()
            .map_err(|_| StoreError::Poisoned("document store"))?;
        Ok(guard.get(key).and_then(|variants| variants.get(&options)).cloned())
    }

    fn put(&self, key: &ResourceKey, document: Document) -> Result<(), StoreError> {
        self.documents
            .write()
            .map_err(|_| StoreError::Poisoned("document store"))?
            .entry(key.clone())
            .or_default()
            .insert(document.options, document);
        Ok(())
    }

    fn remove(&self, key: &ResourceKey) -> Result<(), StoreError> {
        self.documents
            .write()
            .map_err(|_| StoreError::Poisoned("document store"))?
            .remove(key);
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryDiffStore {
    history: usize,
    records: RwLock<HashMap<ResourceKey, VecDeque<DiffRecord>>>,
}

impl InMemoryDiffStore {
    pub const DEFAULT_HISTORY: usize = 16;

    pub fn new() -> Self {
        Self::with_history(Self::DEFAULT_HISTORY)
    }

    /// Keep at most `history` records per document; zero keeps nothing.
    pub fn with_history(history: usize) -> Self {
        Self {
            history,
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDiffStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffStore for InMemoryDiffStore {
    fn add_differences(
        &self,
        key: &ResourceKey,
        differences: Vec<Difference>,
    ) -> Result<(), StoreError> {
        if self.history == 0 {
            return Ok(());
        }
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("diff store"))?;
        let records = guard.entry(key.clone()).or_default();
        while records.len() >= self.history {
            records.pop_front();
        }
        records.push_back(DiffRecord {
            detected_at: Utc::now(),
            differences,
        });
        Ok(())
    }

    fn get_differences(&self, key: &ResourceKey) -> Result<Vec<DiffRecord>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("diff store"))?;
        Ok(guard
            .get(key)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn remove_differences(&self, key: &ResourceKey) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned("diff store"))?
            .remove(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ResourceKey, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn add(&self, client: &ResourceKey) -> Result<Session, StoreError> {
        let mut guard = self
            .sessions
            .write()
            .map_err(|_| StoreError::Poisoned("session store"))?;
        let session = guard.entry(client.clone()).or_insert_with(|| Session {
            token: Uuid::new_v4(),
            client: client.clone(),
        });
        Ok(session.clone())
    }

    fn validate_token(&self, client: &ResourceKey, token: Uuid) -> Result<bool, StoreError> {
        let guard = self
            .sessions
            .read()
            .map_err(|_| StoreError::Poisoned("session store"))?;
        Ok(guard.get(client).is_some_and(|s| s.token == token))
    }

    fn remove_session(&self, client: &ResourceKey) -> Result<bool, StoreError> {
        Ok(self
            .sessions
            .write()
            .map_err(|_| StoreError::Poisoned("session store"))?
            .remove(client)
            .is_some())
    }
}
