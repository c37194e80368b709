//! Workspace umbrella crate for the Argus document watcher.
//!
//! Clients subscribe a callback url and a set of keywords to a document. The
//! [`JobManager`] re-fetches every watched document on a schedule, diffs the
//! new token stream against the previous snapshot, matches the differences
//! against each subscriber's keywords and posts a notification when one
//! occurs.
//!
//! The pipeline stages live in their own crates and are re-exported here:
//! `canonical` (cleaning, languages, pooled tokenization), `ingest` (fetch,
//! read, build snapshots and keywords), `diff` (token alignment) and
//! `matcher` (phrase matching with slop).

mod config;
mod error;
mod manager;
mod notify;
mod request;
mod scheduler;
mod store;

use std::sync::Arc;
use std::time::Duration;

use canonical::ParserPool;
use ingest::{DocumentBuilder, Fetcher, HttpFetcher, KeywordBuilder, TextPipeline};

pub use canonical::{ParseOptions, PoolError};
pub use diff::{DiffEvent, Difference, detect};
pub use ingest::{BuildError, Document, FetchConfig, FetchError, Keyword, ResourceKey, Slop};
pub use matcher::{EventFilter, Match, find_matches};

pub use crate::config::{
    ArgusConfig, ConfigLoadError, JobsYamlConfig, LoggingYamlConfig, ParserYamlConfig,
};
pub use crate::error::{ArgusError, JobError, NotifyError, StoreError};
pub use crate::manager::{JobManager, JobManagerParts, JobSettings, Subscription, TickOutcome};
pub use crate::notify::{
    Notification, NotificationSender, NotificationStatus, SESSION_HEADER, WebhookNotifier,
};
pub use crate::request::{CancelRequest, DEFAULT_CLIENT_CONTENT_TYPE, SubscribeRequest};
pub use crate::scheduler::{Scheduler, Task};
pub use crate::store::{
    DiffRecord, DiffStore, DocumentStore, InMemoryDiffStore, InMemoryDocumentStore,
    InMemorySessionStore, Session, SessionStore,
};

/// Assemble a manager over HTTP transport, webhook delivery and in-memory
/// stores.
pub fn build_manager(config: &ArgusConfig) -> Result<JobManager, ArgusError> {
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let notifier = Arc::new(WebhookNotifier::new(Duration::from_secs(
        config.jobs.notification_timeout_secs,
    ))?);
    build_manager_with(config, fetcher, notifier)
}

/// Assemble a manager from `config` with the given transport and notifier.
pub fn build_manager_with(
    config: &ArgusConfig,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn NotificationSender>,
) -> Result<JobManager, ArgusError> {
    config.validate()?;

    let resources = Arc::new(config.parser.language_resources()?);
    let pool = Arc::new(ParserPool::new(config.parser.pool_size));
    let pipeline = TextPipeline::new(resources, pool);

    Ok(JobManager::new(JobManagerParts {
        documents: DocumentBuilder::new(fetcher, Arc::new(config.reader_registry()), pipeline.clone()),
        keywords: KeywordBuilder::new(pipeline),
        document_store: Arc::new(InMemoryDocumentStore::new()),
        diff_store: Arc::new(InMemoryDiffStore::with_history(config.jobs.diff_history)),
        session_store: Arc::new(InMemorySessionStore::new()),
        notifier,
        settings: config.jobs.settings(),
    }))
}
