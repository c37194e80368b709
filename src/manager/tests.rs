use super::*;

use std::sync::Mutex;

use async_trait::async_trait;
use canonical::{DEFAULT_LANGUAGE, LanguageResources, ParserPool};
use diff::DiffEvent;
use ingest::{MemoryFetcher, ReaderRegistry, TextPipeline};

use crate::store::{InMemoryDiffStore, InMemoryDocumentStore, InMemorySessionStore};

const DOC: &str = "mem://argus";
const CLIENT: &str = "https://client.example/hook";
const OTHER_CLIENT: &str = "https://other.example/hook";

const NORSE: &str = "Argus Panoptes in Norse mythology";
const GREEK: &str = "Argus Panoptes in Greek mythology";

#[derive(Default)]
struct RecordingNotifier {
    delay: Option<Duration>,
    sent: Mutex<Vec<(Session, Vec<Match>)>>,
    timeouts: Mutex<Vec<Session>>,
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send_ok(
        &self,
        url: &str,
        _content_type: &str,
        session: &Session,
        matches: &[Match],
    ) -> Result<(), NotifyError> {
        assert_eq!(url, DOC);
        if let Some(delay) = self.delay {
            time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((session.clone(), matches.to_vec()));
        Ok(())
    }

    async fn send_timeout(
        &self,
        _url: &str,
        _content_type: &str,
        session: &Session,
    ) -> Result<(), NotifyError> {
        self.timeouts.lock().unwrap().push(session.clone());
        Ok(())
    }
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<(Session, Vec<Match>)> {
        self.sent.lock().unwrap().clone()
    }
}

struct Harness {
    manager: JobManager,
    fetcher: Arc<MemoryFetcher>,
    notifier: Arc<RecordingNotifier>,
    sessions: Arc<InMemorySessionStore>,
    diffs: Arc<InMemoryDiffStore>,
}

fn harness_with(settings: JobSettings, notifier: RecordingNotifier) -> Harness {
    let resources = LanguageResources::builtin(&["en", "de"], DEFAULT_LANGUAGE).expect("resources");
    let pipeline = TextPipeline::new(Arc::new(resources), Arc::new(ParserPool::new(2)));
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.set(DOC, Some("text/plain"), NORSE);

    let notifier = Arc::new(notifier);
    let sessions = Arc::new(InMemorySessionStore::new());
    let diffs = Arc::new(InMemoryDiffStore::with_history(4));
    let manager = JobManager::new(JobManagerParts {
        documents: DocumentBuilder::new(
            Arc::clone(&fetcher) as _,
            Arc::new(ReaderRegistry::with_defaults()),
            pipeline.clone(),
        ),
        keywords: KeywordBuilder::new(pipeline),
        document_store: Arc::new(InMemoryDocumentStore::new()),
        diff_store: Arc::clone(&diffs) as _,
        session_store: Arc::clone(&sessions) as _,
        notifier: Arc::clone(&notifier) as _,
        settings,
    });

    Harness {
        manager,
        fetcher,
        notifier,
        sessions,
        diffs,
    }
}

fn harness() -> Harness {
    harness_with(JobSettings::default(), RecordingNotifier::default())
}

fn request(client: &str, keywords: &[&str]) -> SubscribeRequest {
    let mut request = SubscribeRequest::new(DOC, client, keywords.iter().copied());
    request.interval = 3600;
    request
}

fn key() -> ResourceKey {
    ResourceKey::new(DOC, "text/plain")
}

#[tokio::test]
async fn first_subscription_takes_a_baseline_and_schedules() {
    let h = harness();
    let subscription = h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();

    assert_eq!(subscription.document, key());
    assert_eq!(subscription.interval, Duration::from_secs(3600));
    assert_eq!(h.manager.watched(), vec![key()]);
    assert!(h.manager.is_scheduled(&key()));

    let baseline = h
        .manager
        .last_snapshot(&key(), ParseOptions::default())
        .await
        .expect("baseline snapshot");
    assert_eq!(baseline.raw_text.as_ref(), NORSE);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn duplicate_subscription_conflicts_until_cancelled() {
    let h = harness();
    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();

    let err = h
        .manager
        .create_job(request(CLIENT, &["greek"]))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    h.manager
        .create_job(request(OTHER_CLIENT, &["greek"]))
        .await
        .expect("another client may subscribe");

    h.manager
        .cancel_matching_job(&CancelRequest::new(DOC, CLIENT))
        .await
        .unwrap();
    h.manager
        .create_job(request(CLIENT, &["greek"]))
        .await
        .expect("free again after cancel");
    assert_eq!(h.manager.subscriptions().len(), 2);
}

#[tokio::test]
async fn cancelling_unknown_subscriptions_is_not_found() {
    let h = harness();
    let err = h
        .manager
        .cancel_matching_job(&CancelRequest::new(DOC, CLIENT))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();
    let err = h
        .manager
        .cancel_matching_job(&CancelRequest::new(DOC, OTHER_CLIENT))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn last_cancel_discards_the_entry() {
    let h = harness();
    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();
    h.manager
        .cancel_matching_job(&CancelRequest::new(DOC, CLIENT))
        .await
        .unwrap();

    assert!(h.manager.watched().is_empty());
    assert!(!h.manager.is_scheduled(&key()));
    assert_eq!(h.manager.run_tick(&key()).await, TickOutcome::Unwatched);
    assert!(
        h.manager
            .last_snapshot(&key(), ParseOptions::default())
            .await
            .is_none()
    );
}

#[tokio::test]
async fn changes_notify_matching_subscribers_only() {
    let h = harness();
    let watcher = h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();
    let mut additions_ignored = request(OTHER_CLIENT, &["greek"]);
    additions_ignored.ignore_added = true;
    h.manager.create_job(additions_ignored).await.unwrap();

    h.fetcher.set(DOC, Some("text/plain"), GREEK);
    let outcome = h.manager.run_tick(&key()).await;
    assert_eq!(
        outcome,
        TickOutcome::Detected {
            differences: 2,
            notified: 1
        }
    );

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    let (session, matches) = &sent[0];
    assert_eq!(session, &watcher.session);
    assert_eq!(
        matches,
        &vec![Match {
            event: DiffEvent::Deleted,
            keyword: "norse".into(),
            text: "Norse".into(),
            snippet: NORSE.into(),
        }]
    );

    let records = h.diffs.get_differences(&key()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].differences.len(), 2);
}

#[tokio::test]
async fn unchanged_document_sends_nothing() {
    let h = harness();
    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();

    let outcome = h.manager.run_tick(&key()).await;
    assert_eq!(
        outcome,
        TickOutcome::Detected {
            differences: 0,
            notified: 0
        }
    );
    assert!(h.notifier.sent().is_empty());
    assert!(h.diffs.get_differences(&key()).unwrap().is_empty());
}

#[tokio::test]
async fn success_resets_the_failure_count() {
    let h = harness();
    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();

    h.fetcher.remove(DOC);
    assert_eq!(
        h.manager.run_tick(&key()).await,
        TickOutcome::Failed {
            consecutive_failures: 1
        }
    );

    h.fetcher.set(DOC, Some("text/plain"), NORSE);
    assert!(matches!(
        h.manager.run_tick(&key()).await,
        TickOutcome::Detected { .. }
    ));
    assert_eq!(h.manager.consecutive_failures(&key()).await, Some(0));
}

#[tokio::test]
async fn failure_threshold_drops_every_subscription() {
    let settings = JobSettings {
        failure_threshold: 3,
        ..JobSettings::default()
    };
    let h = harness_with(settings, RecordingNotifier::default());
    let subscription = h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();
    h.manager
        .create_job(request(OTHER_CLIENT, &["greek"]))
        .await
        .unwrap();

    h.fetcher.remove(DOC);
    for expected in 1..=2 {
        assert_eq!(
            h.manager.run_tick(&key()).await,
            TickOutcome::Failed {
                consecutive_failures: expected
            }
        );
    }
    assert_eq!(h.manager.run_tick(&key()).await, TickOutcome::Removed);

    assert!(h.manager.watched().is_empty());
    assert!(h.manager.subscriptions().is_empty());
    assert!(!h.manager.is_scheduled(&key()));
    assert!(
        !h.sessions
            .validate_token(subscription.client(), subscription.session.token)
            .unwrap()
    );
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn unreachable_document_still_registers() {
    let h = harness();
    h.fetcher.remove(DOC);

    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();
    assert_eq!(h.manager.consecutive_failures(&key()).await, Some(1));
    assert!(
        h.manager
            .last_snapshot(&key(), ParseOptions::default())
            .await
            .is_none()
    );
}

#[tokio::test]
async fn shortest_interval_drives_the_schedule() {
    let h = harness();
    let mut slow = request(CLIENT, &["norse"]);
    slow.interval = 600;
    let mut fast = request(OTHER_CLIENT, &["greek"]);
    fast.interval = 60;

    h.manager.create_job(slow).await.unwrap();
    assert_eq!(h.manager.interval(&key()), Some(Duration::from_secs(600)));

    h.manager.create_job(fast).await.unwrap();
    assert_eq!(h.manager.interval(&key()), Some(Duration::from_secs(60)));

    h.manager
        .cancel_matching_job(&CancelRequest::new(DOC, OTHER_CLIENT))
        .await
        .unwrap();
    assert_eq!(h.manager.interval(&key()), Some(Duration::from_secs(600)));
}

#[tokio::test]
async fn intervals_below_the_floor_are_raised() {
    let settings = JobSettings {
        min_interval: Duration::from_secs(30),
        ..JobSettings::default()
    };
    let h = harness_with(settings, RecordingNotifier::default());
    let mut eager = request(CLIENT, &["norse"]);
    eager.interval = 1;

    let subscription = h.manager.create_job(eager).await.unwrap();
    assert_eq!(subscription.interval, Duration::from_secs(30));
}

#[tokio::test]
async fn oversized_intervals_are_capped_and_keep_the_runtime_alive() {
    let h = harness();
    let mut lazy = request(CLIENT, &["norse"]);
    lazy.interval = u64::MAX;

    let subscription = h.manager.create_job(lazy).await.unwrap();
    assert_eq!(subscription.interval, JobSettings::default().max_interval);
    assert_eq!(h.manager.interval(&key()), Some(JobSettings::default().max_interval));

    // Give the spawned schedule loop a chance to start its interval.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(h.manager.is_scheduled(&key()));
    assert!(matches!(
        h.manager.run_tick(&key()).await,
        TickOutcome::Detected { .. }
    ));
}

#[test]
fn interval_bounds_apply_in_order() {
    let settings = JobSettings {
        min_interval: Duration::from_secs(10),
        max_interval: Duration::from_secs(100),
        ..JobSettings::default()
    };
    assert_eq!(settings.bound_interval(0), Duration::from_secs(10));
    assert_eq!(settings.bound_interval(50), Duration::from_secs(50));
    assert_eq!(settings.bound_interval(u64::MAX), Duration::from_secs(100));
}

#[tokio::test]
async fn each_option_set_keeps_its_own_snapshot() {
    let h = harness();
    let mut stemmed = request(OTHER_CLIENT, &["watchers"]);
    stemmed.enable_stemming = true;
    let stemmed_options = stemmed.parse_options();

    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();
    h.manager.create_job(stemmed).await.unwrap();
    h.manager.run_tick(&key()).await;

    assert!(h.manager.last_snapshot(&key(), stemmed_options).await.is_some());
    assert!(
        h.manager
            .last_snapshot(&key(), ParseOptions::default())
            .await
            .is_some()
    );

    h.manager
        .cancel_matching_job(&CancelRequest::new(DOC, OTHER_CLIENT))
        .await
        .unwrap();
    h.manager.run_tick(&key()).await;
    assert!(h.manager.last_snapshot(&key(), stemmed_options).await.is_none());
}

#[tokio::test]
async fn stemmed_keywords_match_inflected_text() {
    let h = harness();
    h.fetcher.set(DOC, Some("text/plain"), "Io was guarded");
    let mut stemmed = request(CLIENT, &["watching"]);
    stemmed.enable_stemming = true;
    h.manager.create_job(stemmed).await.unwrap();

    h.fetcher.set(DOC, Some("text/plain"), "Io was watched");
    h.manager.run_tick(&key()).await;

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    let events: Vec<(DiffEvent, &str)> = sent[0]
        .1
        .iter()
        .map(|m| (m.event, m.text.as_str()))
        .collect();
    assert_eq!(events, vec![(DiffEvent::Inserted, "watched")]);
}

#[tokio::test]
async fn keywords_that_filter_to_nothing_are_rejected() {
    let h = harness();
    let err = h
        .manager
        .create_job(request(CLIENT, &["the", "norse"]))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::InvalidRequest(_)));
    assert!(h.manager.watched().is_empty());
}

#[tokio::test]
async fn sessions_live_as_long_as_the_clients_subscriptions() {
    let h = harness();
    h.fetcher.set("mem://io", Some("text/plain"), "Io the heifer");

    let first = h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();
    let mut elsewhere = SubscribeRequest::new("mem://io", CLIENT, ["heifer"]);
    elsewhere.interval = 3600;
    let second = h.manager.create_job(elsewhere).await.unwrap();
    assert_eq!(first.session, second.session);

    h.manager
        .cancel_matching_job(&CancelRequest::new(DOC, CLIENT))
        .await
        .unwrap();
    assert!(
        h.sessions
            .validate_token(first.client(), first.session.token)
            .unwrap()
    );

    h.manager
        .cancel_matching_job(&CancelRequest::new("mem://io", CLIENT))
        .await
        .unwrap();
    assert!(
        !h.sessions
            .validate_token(first.client(), first.session.token)
            .unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn slow_delivery_turns_into_a_timeout_notice() {
    let settings = JobSettings {
        notification_timeout: Duration::from_millis(50),
        ..JobSettings::default()
    };
    let notifier = RecordingNotifier {
        delay: Some(Duration::from_secs(5)),
        ..RecordingNotifier::default()
    };
    let h = harness_with(settings, notifier);
    let subscription = h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();

    h.fetcher.set(DOC, Some("text/plain"), GREEK);
    h.manager.run_tick(&key()).await;

    assert!(h.notifier.sent().is_empty());
    let timeouts = h.notifier.timeouts.lock().unwrap().clone();
    assert_eq!(timeouts, vec![subscription.session.clone()]);
}

#[tokio::test]
async fn shutdown_stops_schedules_and_cancels_builds() {
    let h = harness();
    h.manager.create_job(request(CLIENT, &["norse"])).await.unwrap();

    h.manager.shutdown();
    assert!(!h.manager.is_scheduled(&key()));
    assert_eq!(
        h.manager.run_tick(&key()).await,
        TickOutcome::Failed {
            consecutive_failures: 1
        }
    );
}
