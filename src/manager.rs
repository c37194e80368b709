//! The job manager: registry of watched documents, detection ticks and
//! notification dispatch.
//!
//! Every watched `(url, content_type)` has one [`WatchEntry`] in the registry.
//! The entry's tick state sits behind an async mutex that acts as the
//! resource's serialization token: detection ticks hold it for their whole
//! run, and `create_job` / `cancel_matching_job` take it before changing an
//! existing entry's subscriptions. Ticks of different resources never wait on
//! each other.
//!
//! The registry itself is a plain `RwLock` that is only ever held for
//! synchronous sections. A caller that resolved an entry's token and then
//! finds the entry replaced or gone retries against the current registry.
//!
//! ```text
//! create_job ──▶ registry ──▶ scheduler ──▶ run_tick
//!                                             │ build_variants
//!                                             │ detect (per parse options)
//!                                             │ find_all_matches (per subscription)
//!                                             ▼
//!                                        NotificationSender
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use canonical::ParseOptions;
use diff::{Difference, detect};
use futures::FutureExt;
use ingest::{Document, DocumentBuilder, Keyword, KeywordBuilder, ResourceKey};
use matcher::{EventFilter, Match, find_all_matches};
use metrics::{counter, histogram};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::error::{JobError, NotifyError};
use crate::notify::NotificationSender;
use crate::request::{CancelRequest, SubscribeRequest};
use crate::scheduler::{Scheduler, Task};
use crate::store::{DiffStore, DocumentStore, Session, SessionStore};

/// Failure and timing policy of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    /// Consecutive failed ticks after which a watched document is dropped
    /// along with all of its subscriptions.
    pub failure_threshold: u32,
    /// Bound on each notification delivery.
    pub notification_timeout: Duration,
    /// Floor for subscription intervals.
    pub min_interval: Duration,
    /// Ceiling for subscription intervals.
    pub max_interval: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            notification_timeout: Duration::from_secs(10),
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

impl JobSettings {
    /// `secs` raised to `min_interval`, then capped at `max_interval`.
    pub fn bound_interval(&self, secs: u64) -> Duration {
        Duration::from_secs(secs)
            .min(self.max_interval)
            .max(self.min_interval)
    }
}

/// Collaborators handed to [`JobManager::new`].
pub struct JobManagerParts {
    pub documents: DocumentBuilder,
    pub keywords: KeywordBuilder,
    pub document_store: Arc<dyn DocumentStore>,
    pub diff_store: Arc<dyn DiffStore>,
    pub session_store: Arc<dyn SessionStore>,
    pub notifier: Arc<dyn NotificationSender>,
    pub settings: JobSettings,
}

/// One client's registration against one watched document.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub document: ResourceKey,
    pub session: Session,
    pub keywords: HashSet<Keyword>,
    pub filter: EventFilter,
    pub options: ParseOptions,
    pub snippet_offset: usize,
    pub interval: Duration,
}

impl Subscription {
    pub fn client(&self) -> &ResourceKey {
        &self.session.client
    }
}

/// What one detection tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The resource is not (or no longer) watched.
    Unwatched,
    /// A snapshot was built. `differences` counts runs across all parse
    /// option sets; `notified` counts subscriptions a delivery went to.
    Detected { differences: usize, notified: usize },
    /// The build failed and the failure threshold is not reached yet.
    Failed { consecutive_failures: u32 },
    /// The build failed once too often; the entry is gone.
    Removed,
}

#[derive(Debug, Default)]
struct TickState {
    snapshots: HashMap<ParseOptions, Document>,
    consecutive_failures: u32,
}

type TickToken = Arc<AsyncMutex<TickState>>;

struct WatchEntry {
    state: TickToken,
    /// Keyed by client url.
    subscriptions: HashMap<String, Arc<Subscription>>,
    interval: Duration,
}

impl WatchEntry {
    fn shortest_interval(&self) -> Option<Duration> {
        self.subscriptions.values().map(|s| s.interval).min()
    }
}

struct Inner {
    documents: DocumentBuilder,
    keywords: KeywordBuilder,
    document_store: Arc<dyn DocumentStore>,
    diff_store: Arc<dyn DiffStore>,
    session_store: Arc<dyn SessionStore>,
    notifier: Arc<dyn NotificationSender>,
    settings: JobSettings,
    registry: RwLock<HashMap<ResourceKey, WatchEntry>>,
    scheduler: Scheduler<ResourceKey>,
}

impl Inner {
    fn read_registry(&self) -> RwLockReadGuard<'_, HashMap<ResourceKey, WatchEntry>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, HashMap<ResourceKey, WatchEntry>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
    }
}

/// Orchestrates watching, detection and notification.
///
/// Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

impl JobManager {
    pub fn new(parts: JobManagerParts) -> Self {
        Self {
            inner: Arc::new(Inner {
                documents: parts.documents,
                keywords: parts.keywords,
                document_store: parts.document_store,
                diff_store: parts.diff_store,
                session_store: parts.session_store,
                notifier: parts.notifier,
                settings: parts.settings,
                registry: RwLock::new(HashMap::new()),
                scheduler: Scheduler::new(),
            }),
        }
    }

    pub fn settings(&self) -> JobSettings {
        self.inner.settings
    }

    /// Subscribe a client to a document.
    ///
    /// The first subscription to a resource creates its entry, runs the
    /// first tick before returning and schedules the following ones. Later
    /// subscriptions join the entry, and a shorter interval reschedules it.
    /// A client already subscribed to the same resource is rejected with
    /// [`JobError::Conflict`].
    pub async fn create_job(&self, request: SubscribeRequest) -> Result<Arc<Subscription>, JobError> {
        request.validate()?;
        let document = request.document_key();
        let options = request.parse_options();
        let keywords = self.build_keywords(&request, options).await?;

        let draft = Draft {
            client: request.client_key(),
            keywords,
            filter: request.event_filter(),
            options,
            snippet_offset: request.snippet_offset,
            interval: self.inner.settings.bound_interval(request.interval),
        };

        loop {
            match self.entry_token(&document) {
                None => {
                    let Some(subscription) = self.open_entry(&document, &draft)? else {
                        continue;
                    };
                    info!(
                        url = %document.url,
                        content_type = %document.content_type,
                        client = %draft.client.url,
                        new_watch = true,
                        "job_created"
                    );
                    self.run_tick(&document).await;
                    return Ok(subscription);
                }
                Some(token) => {
                    let _serialized = token.lock().await;
                    let Some(subscription) = self.join_entry(&document, &token, &draft)? else {
                        continue;
                    };
                    info!(
                        url = %document.url,
                        content_type = %document.content_type,
                        client = %draft.client.url,
                        new_watch = false,
                        "job_created"
                    );
                    return Ok(subscription);
                }
            }
        }
    }

    /// Remove the client's subscription to a document. Removing the last
    /// subscription stops the schedule and discards the entry; a tick that is
    /// already running finishes first.
    pub async fn cancel_matching_job(&self, request: &CancelRequest) -> Result<(), JobError> {
        let document = request.document_key();
        let client_url = request.client_url.trim();

        loop {
            let Some(token) = self.entry_token(&document) else {
                return Err(JobError::NotFound {
                    document,
                    client_url: client_url.to_string(),
                });
            };
            let _serialized = token.lock().await;
            if self.withdraw(&document, &token, client_url)? {
                info!(
                    url = %document.url,
                    content_type = %document.content_type,
                    client = client_url,
                    "job_cancelled"
                );
                return Ok(());
            }
        }
    }

    /// Run one detection tick for `key` now.
    ///
    /// Serialized with scheduled ticks of the same resource. Returns once
    /// the tick's notifications have been delivered or have timed out.
    pub async fn run_tick(&self, key: &ResourceKey) -> TickOutcome {
        let span = info_span!("argus.tick", url = %key.url, content_type = %key.content_type);
        self.tick(key).instrument(span).await
    }

    /// Stop every schedule and close the parser pool. Pending builds fail as
    /// cancelled.
    pub fn shutdown(&self) {
        let cancelled = self.inner.scheduler.cancel_all();
        self.inner.documents.pipeline().pool().close();
        info!(schedules = cancelled, "job_manager_shutdown");
    }

    /// Watched resources, sorted.
    pub fn watched(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.inner.read_registry().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Every live subscription, sorted by document then client.
    pub fn subscriptions(&self) -> Vec<Arc<Subscription>> {
        let mut all: Vec<Arc<Subscription>> = self
            .inner
            .read_registry()
            .values()
            .flat_map(|entry| entry.subscriptions.values().cloned())
            .collect();
        all.sort_by(|a, b| (&a.document, a.client()).cmp(&(&b.document, b.client())));
        all
    }

    /// Current tick interval of a watched resource.
    pub fn interval(&self, key: &ResourceKey) -> Option<Duration> {
        self.inner.read_registry().get(key).map(|entry| entry.interval)
    }

    pub fn is_scheduled(&self, key: &ResourceKey) -> bool {
        self.inner.scheduler.is_scheduled(key)
    }

    /// Latest snapshot of `key` tokenized with `options`. Waits for a running
    /// tick of that resource to finish.
    pub async fn last_snapshot(&self, key: &ResourceKey, options: ParseOptions) -> Option<Document> {
        let token = self.entry_token(key)?;
        let state = token.lock().await;
        state.snapshots.get(&options).cloned()
    }

    pub async fn consecutive_failures(&self, key: &ResourceKey) -> Option<u32> {
        let token = self.entry_token(key)?;
        let state = token.lock().await;
        Some(state.consecutive_failures)
    }

    async fn build_keywords(
        &self,
        request: &SubscribeRequest,
        options: ParseOptions,
    ) -> Result<HashSet<Keyword>, JobError> {
        let mut keywords = HashSet::with_capacity(request.keywords.len());
        for phrase in request.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            keywords.insert(self.inner.keywords.build(phrase, options, request.slop).await?);
        }
        Ok(keywords)
    }

    fn entry_token(&self, key: &ResourceKey) -> Option<TickToken> {
        self.inner
            .read_registry()
            .get(key)
            .map(|entry| Arc::clone(&entry.state))
    }

    /// Subscriptions of the entry guarded by `token`, or `None` if the entry
    /// was discarded or replaced.
    fn live_subscriptions(&self, key: &ResourceKey, token: &TickToken) -> Option<Vec<Arc<Subscription>>> {
        let registry = self.inner.read_registry();
        let entry = registry.get(key).filter(|e| Arc::ptr_eq(&e.state, token))?;
        Some(entry.subscriptions.values().cloned().collect())
    }

    /// Create the entry for `document`. `None` if another caller created it
    /// first.
    fn open_entry(&self, document: &ResourceKey, draft: &Draft) -> Result<Option<Arc<Subscription>>, JobError> {
        let mut registry = self.inner.write_registry();
        if registry.contains_key(document) {
            return Ok(None);
        }

        let mut state = TickState::default();
        if let Some(seed) = self.inner.document_store.get(document, draft.options)? {
            debug!(url = %document.url, "snapshot_seeded");
            state.snapshots.insert(draft.options, seed);
        }

        let session = self.inner.session_store.add(&draft.client)?;
        let subscription = Arc::new(draft.subscription(document, session));
        registry.insert(
            document.clone(),
            WatchEntry {
                state: Arc::new(AsyncMutex::new(state)),
                subscriptions: HashMap::from([(draft.client.url.clone(), Arc::clone(&subscription))]),
                interval: draft.interval,
            },
        );
        self.inner
            .scheduler
            .schedule(document.clone(), draft.interval, self.tick_task(document));
        Ok(Some(subscription))
    }

    /// Add a subscription to the existing entry guarded by `token`. `None` if
    /// that entry is gone.
    fn join_entry(
        &self,
        document: &ResourceKey,
        token: &TickToken,
        draft: &Draft,
    ) -> Result<Option<Arc<Subscription>>, JobError> {
        let mut registry = self.inner.write_registry();
        let Some(entry) = registry.get_mut(document).filter(|e| Arc::ptr_eq(&e.state, token)) else {
            return Ok(None);
        };
        if entry.subscriptions.contains_key(&draft.client.url) {
            return Err(JobError::Conflict {
                document: document.clone(),
                client_url: draft.client.url.clone(),
            });
        }

        let session = self.inner.session_store.add(&draft.client)?;
        let subscription = Arc::new(draft.subscription(document, session));
        entry
            .subscriptions
            .insert(draft.client.url.clone(), Arc::clone(&subscription));
        if draft.interval < entry.interval {
            entry.interval = draft.interval;
            self.inner.scheduler.reschedule(document, draft.interval);
        }
        Ok(Some(subscription))
    }

    /// Remove one subscription from the entry guarded by `token`. False if
    /// that entry is gone.
    fn withdraw(&self, document: &ResourceKey, token: &TickToken, client_url: &str) -> Result<bool, JobError> {
        let mut registry = self.inner.write_registry();
        let Some(entry) = registry.get_mut(document).filter(|e| Arc::ptr_eq(&e.state, token)) else {
            return Ok(false);
        };
        let Some(removed) = entry.subscriptions.remove(client_url) else {
            return Err(JobError::NotFound {
                document: document.clone(),
                client_url: client_url.to_string(),
            });
        };

        let emptied = entry.subscriptions.is_empty();
        if let Some(shortest) = entry.shortest_interval().filter(|s| *s != entry.interval) {
            entry.interval = shortest;
            self.inner.scheduler.reschedule(document, shortest);
        }
        drop(registry);

        if emptied {
            self.discard(document, token, "last_subscription_cancelled");
        }
        self.release_sessions([removed.client()]);
        Ok(true)
    }

    /// Drop the entry guarded by `token` with its schedule, stored snapshots
    /// and diff history.
    fn discard(&self, key: &ResourceKey, token: &TickToken, reason: &'static str) -> bool {
        let removed = {
            let mut registry = self.inner.write_registry();
            match registry.get(key) {
                Some(entry) if Arc::ptr_eq(&entry.state, token) => registry.remove(key),
                _ => None,
            }
        };
        let Some(entry) = removed else {
            return false;
        };

        self.inner.scheduler.cancel(key);
        if let Err(err) = self.inner.document_store.remove(key) {
            warn!(error = %err, "snapshot_remove_failure");
        }
        if let Err(err) = self.inner.diff_store.remove_differences(key) {
            warn!(error = %err, "differences_remove_failure");
        }
        self.release_sessions(entry.subscriptions.values().map(|s| s.client()));

        counter!("argus_watch_removed_total").increment(1);
        info!(
            url = %key.url,
            content_type = %key.content_type,
            reason,
            subscriptions = entry.subscriptions.len(),
            "watch_removed"
        );
        true
    }

    /// Remove the sessions of clients that no longer subscribe to anything.
    fn release_sessions<'a>(&self, clients: impl IntoIterator<Item = &'a ResourceKey>) {
        let registry = self.inner.read_registry();
        for client in clients {
            let in_use = registry
                .values()
                .flat_map(|entry| entry.subscriptions.values())
                .any(|s| s.client() == client);
            if in_use {
                continue;
            }
            match self.inner.session_store.remove_session(client) {
                Ok(true) => debug!(client = %client.url, "session_removed"),
                Ok(false) => {}
                Err(err) => warn!(client = %client.url, error = %err, "session_remove_failure"),
            }
        }
    }

    fn tick_task(&self, key: &ResourceKey) -> Task {
        let inner = Arc::downgrade(&self.inner);
        let key = key.clone();
        Arc::new(move || {
            let inner = inner.clone();
            let key = key.clone();
            async move {
                if let Some(inner) = inner.upgrade() {
                    JobManager { inner }.run_tick(&key).await;
                }
            }
            .boxed()
        })
    }

    async fn tick(&self, key: &ResourceKey) -> TickOutcome {
        let Some(token) = self.entry_token(key) else {
            return TickOutcome::Unwatched;
        };
        let mut state = token.lock().await;
        let Some(subscriptions) = self.live_subscriptions(key, &token) else {
            return TickOutcome::Unwatched;
        };

        let mut variants: Vec<ParseOptions> = Vec::new();
        for subscription in &subscriptions {
            if !variants.contains(&subscription.options) {
                variants.push(subscription.options);
            }
        }

        let start = Instant::now();
        let built = self
            .inner
            .documents
            .build_variants(&key.url, Some(&key.content_type), &variants)
            .await;
        histogram!("argus_tick_ms").record(start.elapsed().as_secs_f64() * 1000.0);

        let documents = match built {
            Ok(documents) => documents,
            Err(err) => {
                state.consecutive_failures += 1;
                let consecutive_failures = state.consecutive_failures;
                let threshold = self.inner.settings.failure_threshold;
                counter!("argus_ticks_total", "outcome" => "failure").increment(1);
                warn!(
                    error = %err,
                    consecutive_failures,
                    threshold,
                    elapsed_micros = start.elapsed().as_micros(),
                    "tick_failure"
                );
                if consecutive_failures >= threshold {
                    self.discard(key, &token, "failure_threshold");
                    return TickOutcome::Removed;
                }
                return TickOutcome::Failed { consecutive_failures };
            }
        };
        state.consecutive_failures = 0;

        let mut per_options: HashMap<ParseOptions, Vec<Difference>> = HashMap::new();
        let mut recorded: Vec<Difference> = Vec::new();
        for document in documents {
            let options = document.options;
            if let Some(previous) = state.snapshots.get(&options) {
                let differences = detect(previous, &document);
                recorded.extend(differences.iter().cloned());
                per_options.insert(options, differences);
            }
            if let Err(err) = self.inner.document_store.put(key, document.clone()) {
                warn!(error = %err, "snapshot_store_failure");
            }
            state.snapshots.insert(options, document);
        }
        state.snapshots.retain(|options, _| variants.contains(options));

        let differences = recorded.len();
        if differences > 0 {
            if let Err(err) = self.inner.diff_store.add_differences(key, recorded) {
                warn!(error = %err, "differences_store_failure");
            }
        }

        let mut deliveries = JoinSet::new();
        for subscription in &subscriptions {
            let Some(found) = per_options.get(&subscription.options).filter(|d| !d.is_empty()) else {
                continue;
            };
            let matches = find_all_matches(
                &subscription.keywords,
                found,
                subscription.filter,
                subscription.snippet_offset,
            );
            if matches.is_empty() {
                continue;
            }
            let mut matches: Vec<Match> = matches.into_iter().collect();
            matches.sort();
            deliveries.spawn(
                deliver(
                    Arc::clone(&self.inner.notifier),
                    self.inner.settings.notification_timeout,
                    key.clone(),
                    subscription.session.clone(),
                    matches,
                )
                .instrument(Span::current()),
            );
        }
        let notified = deliveries.len();

        counter!("argus_ticks_total", "outcome" => "success").increment(1);
        info!(
            variants = variants.len(),
            differences,
            notified,
            elapsed_micros = start.elapsed().as_micros(),
            "tick_success"
        );

        drop(state);
        while deliveries.join_next().await.is_some() {}
        TickOutcome::Detected {
            differences,
            notified,
        }
    }
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("settings", &self.inner.settings)
            .field("watched", &self.inner.read_registry().len())
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

/// Validated parts of a subscribe request, ready to become a
/// [`Subscription`] once its session is known.
struct Draft {
    client: ResourceKey,
    keywords: HashSet<Keyword>,
    filter: EventFilter,
    options: ParseOptions,
    snippet_offset: usize,
    interval: Duration,
}

impl Draft {
    fn subscription(&self, document: &ResourceKey, session: Session) -> Subscription {
        Subscription {
            document: document.clone(),
            session,
            keywords: self.keywords.clone(),
            filter: self.filter,
            options: self.options,
            snippet_offset: self.snippet_offset,
            interval: self.interval,
        }
    }
}

/// Send one match report. A delivery that outlives `timeout` is abandoned
/// and followed by a timeout notice; nothing is retried.
async fn deliver(
    notifier: Arc<dyn NotificationSender>,
    timeout: Duration,
    document: ResourceKey,
    session: Session,
    matches: Vec<Match>,
) {
    let client = session.client.url.as_str();
    let sent = time::timeout(
        timeout,
        notifier.send_ok(&document.url, &document.content_type, &session, &matches),
    )
    .await;

    match sent {
        Ok(Ok(())) => {
            counter!("argus_notifications_total", "status" => "ok").increment(1);
            info!(client, matches = matches.len(), "notification_sent");
        }
        Ok(Err(err)) => {
            counter!("argus_notifications_total", "status" => "failure").increment(1);
            warn!(client, error = %err, "notification_failure");
        }
        Err(_) => {
            counter!("argus_notifications_total", "status" => "timeout").increment(1);
            warn!(client, timeout = ?timeout, "notification_timeout");
            let notice = time::timeout(
                timeout,
                notifier.send_timeout(&document.url, &document.content_type, &session),
            )
            .await
            .unwrap_or_else(|_| {
                Err(NotifyError::Timeout {
                    url: client.to_string(),
                })
            });
            if let Err(err) = notice {
                warn!(client, error = %err, "notification_failure");
            }
        }
    }
}

#[cfg(test)]
mod tests;
