//! Work queue backends.
//!
//! Every backend hands out a lease token with each received message. Delete
//! and visibility updates must present the current token, which is what keeps
//! concurrent scans from both claiming the same message.
mod azure;
mod memory;

pub use azure::AzureQueue;
pub use memory::InMemoryQueue;

use crate::azure::AzureError;
use crate::types::{LeaseHandle, QueueMessage};
use async_trait::async_trait;
use std::time::Duration;

/// Largest page a single receive may request.
pub const MAX_PAGE_SIZE: u8 = 32;

/// How long a received message stays hidden from other consumers while its
/// lease is held.
pub const RECEIVE_VISIBILITY: Duration = Duration::from_secs(30);

#[derive(thiserror::Error, Debug)]
pub enum QueueError {
    #[error("lease on message {0} is no longer held")]
    LeaseLost(String),
    #[error("azure storage error: {0}")]
    Azure(#[from] AzureError),
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Idempotent create.
    async fn ensure_exists(&self) -> Result<(), QueueError>;

    /// Receives up to `max_count` currently visible messages, leasing each.
    async fn receive_page(&self, max_count: u8) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, handle: LeaseHandle) -> Result<(), QueueError>;

    /// Hides the message from every consumer for `delay`, then releases it.
    async fn update_visibility(
        &self,
        handle: LeaseHandle,
        delay: Duration,
    ) -> Result<(), QueueError>;
}
