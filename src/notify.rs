//! Outbound notifications.

use std::time::Duration;

use async_trait::async_trait;
use matcher::Match;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NotifyError;
use crate::store::Session;

/// Header carrying the client's session token on every delivery.
pub const SESSION_HEADER: &str = "X-Argus-Session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Ok,
    Timeout,
}

/// Body of a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub status: NotificationStatus,
    pub url: String,
    pub content_type: String,
    pub matches: Vec<Match>,
}

impl Notification {
    pub fn ok(url: &str, content_type: &str, matches: &[Match]) -> Self {
        Self {
            status: NotificationStatus::Ok,
            url: url.to_string(),
            content_type: content_type.to_string(),
            matches: matches.to_vec(),
        }
    }

    pub fn timeout(url: &str, content_type: &str) -> Self {
        Self {
            status: NotificationStatus::Timeout,
            url: url.to_string(),
            content_type: content_type.to_string(),
            matches: Vec::new(),
        }
    }
}

/// Delivers match reports to subscribers.
///
/// `url` and `content_type` identify the watched document; the session says
/// where the client listens.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_ok(
        &self,
        url: &str,
        content_type: &str,
        session: &Session,
        matches: &[Match],
    ) -> Result<(), NotifyError>;

    /// Tell the client an earlier delivery did not complete in time.
    async fn send_timeout(
        &self,
        url: &str,
        content_type: &str,
        session: &Session,
    ) -> Result<(), NotifyError>;
}

/// POSTs notifications as JSON to the client's callback url.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("argus/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| NotifyError::Setup(err.to_string()))?;
        Ok(Self { client })
    }

    async fn post(&self, session: &Session, notification: &Notification) -> Result<(), NotifyError> {
        let target = session.client.url.as_str();
        let body =
            serde_json::to_vec(notification).map_err(|err| NotifyError::Encode(err.to_string()))?;

        let response = self
            .client
            .post(target)
            .header(reqwest::header::CONTENT_TYPE, session.client.content_type.as_str())
            .header(SESSION_HEADER, session.token.to_string())
            .body(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    NotifyError::Timeout {
                        url: target.to_string(),
                    }
                } else {
                    NotifyError::Transport {
                        url: target.to_string(),
                        message: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                url: target.to_string(),
                status: status.as_u16(),
            });
        }
        debug!(target, status = ?notification.status, "notification_posted");
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for WebhookNotifier {
    async fn send_ok(
        &self,
        url: &str,
        content_type: &str,
        session: &Session,
        matches: &[Match],
    ) -> Result<(), NotifyError> {
        self.post(session, &Notification::ok(url, content_type, matches))
            .await
    }

    async fn send_timeout(
        &self,
        url: &str,
        content_type: &str,
        session: &Session,
    ) -> Result<(), NotifyError> {
        self.post(session, &Notification::timeout(url, content_type))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff::DiffEvent;

    #[test]
    fn payload_uses_wire_field_names() {
        let matches = [Match {
            event: DiffEvent::Inserted,
            keyword: "greek".into(),
            text: "Greek".into(),
            snippet: "in Greek mythology".into(),
        }];
        let json = serde_json::to_value(Notification::ok(
            "https://example.org/argus",
            "text/html",
            &matches,
        ))
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "status": "ok",
                "url": "https://example.org/argus",
                "contentType": "text/html",
                "matches": [{
                    "event": "inserted",
                    "keyword": "greek",
                    "text": "Greek",
                    "snippet": "in Greek mythology",
                }],
            })
        );
    }

    #[test]
    fn timeout_payload_has_no_matches() {
        let json =
            serde_json::to_value(Notification::timeout("https://example.org", "text/plain")).unwrap();
        assert_eq!(json["status"], "timeout");
        assert_eq!(json["matches"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn unreachable_client_is_a_transport_error() {
        let notifier = WebhookNotifier::new(Duration::from_secs(2)).unwrap();
        let session = Session {
            token: uuid::Uuid::new_v4(),
            client: ingest::ResourceKey::new("http://127.0.0.1:9/hook", "application/json"),
        };
        let err = notifier
            .send_timeout("https://example.org", "text/plain", &session)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Transport { .. } | NotifyError::Timeout { .. }
        ));
    }
}
