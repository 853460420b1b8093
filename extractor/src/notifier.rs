use crate::metrics_defs::NOTIFICATIONS_FAILED;
use crate::types::{ArchiveRecord, NotificationEvent};
use shared::counter;
use std::time::Duration;
use url::Url;

pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered,
    Failed(String),
    /// No receiver is configured.
    Disabled,
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::Delivered => "delivered",
            NotificationOutcome::Failed(_) => "failed",
            NotificationOutcome::Disabled => "disabled",
        }
    }
}

/// Tells the recipient where to download a new archive. Best-effort: one
/// attempt, failures are reported as an outcome and never as an error.
pub struct Notifier {
    http: reqwest::Client,
    endpoint: Url,
    download_location: String,
}

impl Notifier {
    pub fn new(
        endpoint: Url,
        download_location: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Notifier {
            http,
            endpoint,
            download_location: download_location.into(),
        })
    }

    pub fn event_for(&self, record: &ArchiveRecord) -> NotificationEvent {
        let location = self.download_location.trim_end_matches('/');
        NotificationEvent {
            recipient_message: format!(
                "Dear Customer, you have a new file waiting for your download \
                 at location {location}/{}",
                record.name
            ),
        }
    }

    pub async fn notify(&self, event: &NotificationEvent) -> NotificationOutcome {
        // Spaces go out as %20, not the form encoding's `+`
        let param = format!("message={}", urlencoding::encode(&event.recipient_message));
        let mut url = self.endpoint.clone();
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{param}"),
            _ => param,
        };
        url.set_query(Some(&query));

        let outcome = match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => NotificationOutcome::Delivered,
            Ok(response) => {
                NotificationOutcome::Failed(format!("receiver returned {}", response.status()))
            }
            Err(e) => NotificationOutcome::Failed(e.to_string()),
        };

        match &outcome {
            NotificationOutcome::Failed(reason) => {
                counter!(NOTIFICATIONS_FAILED).increment(1);
                tracing::warn!(endpoint = %self.endpoint, reason = %reason, "Notification failed");
            }
            _ => tracing::info!(endpoint = %self.endpoint, "Notification delivered"),
        }
        outcome
    }
}
