use crate::deferral::DEFAULT_DEFERRAL_DELAY;
use crate::notifier::DEFAULT_NOTIFICATION_TIMEOUT;
use crate::queue::MAX_PAGE_SIZE;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Page size must be between 1 and 32, got {0}")]
    InvalidPageSize(u8),

    #[error("Deferral delay cannot be 0")]
    InvalidDeferralDelay,

    #[error("Notification timeout cannot be 0")]
    InvalidNotificationTimeout,

    #[error("Empty {0} name")]
    EmptyName(&'static str),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the extraction API
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    pub admin_listener: Listener,
    pub queue: QueueConfig,
    pub archive: ArchiveConfig,
    /// Notifications are disabled when omitted
    #[serde(default)]
    pub notification: Option<NotificationConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.queue.validate()?;
        self.archive.validate()?;
        if let Some(notification) = &self.notification {
            notification.validate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Where the queue lives. Azure backends take a storage connection string.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum QueueBackend {
    Memory,
    Azure { connection_string: String },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct QueueConfig {
    #[serde(flatten)]
    pub backend: QueueBackend,
    #[serde(default = "default_queue_name")]
    pub name: String,
    #[serde(default = "default_page_size")]
    pub page_size: u8,
    #[serde(default = "default_deferral_delay_secs")]
    pub deferral_delay_secs: u64,
}

impl QueueConfig {
    pub fn deferral_delay(&self) -> Duration {
        Duration::from_secs(self.deferral_delay_secs)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName("queue"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ValidationError::InvalidPageSize(self.page_size));
        }
        if self.deferral_delay_secs == 0 {
            return Err(ValidationError::InvalidDeferralDelay);
        }
        Ok(())
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum ArchiveBackend {
    Memory,
    Filesystem { base_dir: String },
    Azure { connection_string: String },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ArchiveConfig {
    #[serde(flatten)]
    pub backend: ArchiveBackend,
    #[serde(default = "default_container")]
    pub container: String,
}

impl ArchiveConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.container.is_empty() {
            return Err(ValidationError::EmptyName("container"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// Receiver the notification is sent to
    pub url: Url,
    /// Prefix of the download location in the message
    pub download_location: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl NotificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidNotificationTimeout);
        }
        Ok(())
    }
}

fn default_queue_name() -> String {
    "outbound-csv-queue".into()
}

fn default_page_size() -> u8 {
    MAX_PAGE_SIZE
}

fn default_deferral_delay_secs() -> u64 {
    DEFAULT_DEFERRAL_DELAY.as_secs()
}

fn default_container() -> String {
    "outbound".into()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_NOTIFICATION_TIMEOUT.as_secs()
}
