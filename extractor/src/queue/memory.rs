use super::{MessageQueue, QueueError, RECEIVE_VISIBILITY};
use crate::types::{LeaseHandle, QueueMessage};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

struct Entry {
    id: String,
    body: Bytes,
    inserted_at: Instant,
    visible_at: Instant,
    lease_token: Option<String>,
}

/// Process local FIFO queue with the same lease semantics as the storage
/// service: receiving hides a message and issues a fresh lease token, and
/// only the current token may delete or defer it.
pub struct InMemoryQueue {
    entries: Mutex<VecDeque<Entry>>,
    receive_visibility: Duration,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        InMemoryQueue::with_receive_visibility(RECEIVE_VISIBILITY)
    }

    pub fn with_receive_visibility(receive_visibility: Duration) -> Self {
        InMemoryQueue {
            entries: Mutex::new(VecDeque::new()),
            receive_visibility,
        }
    }

    /// Appends a message, visible immediately. Returns its id.
    pub fn enqueue<B: Into<Bytes>>(&self, body: B) -> String {
        let now = Instant::now();
        let id = Uuid::new_v4().to_string();
        self.entries.lock().push_back(Entry {
            id: id.clone(),
            body: body.into(),
            inserted_at: now,
            visible_at: now,
            lease_token: None,
        });
        id
    }

    /// Number of messages held, visible or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Bodies of the messages a receive would return right now, in order.
    pub fn visible_bodies(&self) -> Vec<Bytes> {
        let now = Instant::now();
        self.entries
            .lock()
            .iter()
            .filter(|e| e.visible_at <= now)
            .map(|e| e.body.clone())
            .collect()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        InMemoryQueue::new()
    }
}

fn holds_lease(entry: &Entry, handle: &LeaseHandle) -> bool {
    entry.id == handle.id() && entry.lease_token.as_deref() == Some(handle.lease_token())
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn ensure_exists(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn receive_page(&self, max_count: u8) -> Result<Vec<QueueMessage>, QueueError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let page = entries
            .iter_mut()
            .filter(|e| e.visible_at <= now)
            .take(max_count as usize)
            .map(|entry| {
                let token = Uuid::new_v4().to_string();
                entry.visible_at = now + self.receive_visibility;
                entry.lease_token = Some(token.clone());

                QueueMessage {
                    handle: LeaseHandle::new(entry.id.clone(), token),
                    raw_body: entry.body.clone(),
                    approximate_age: now.duration_since(entry.inserted_at),
                }
            })
            .collect();

        Ok(page)
    }

    async fn delete(&self, handle: LeaseHandle) -> Result<(), QueueError> {
        let mut entries = self.entries.lock();
        match entries.iter().position(|e| holds_lease(e, &handle)) {
            Some(index) => {
                entries.remove(index);
                Ok(())
            }
            None => Err(QueueError::LeaseLost(handle.id().to_string())),
        }
    }

    async fn update_visibility(
        &self,
        handle: LeaseHandle,
        delay: Duration,
    ) -> Result<(), QueueError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| holds_lease(e, &handle))
            .ok_or_else(|| QueueError::LeaseLost(handle.id().to_string()))?;

        entry.visible_at = Instant::now() + delay;
        // The old token is spent, matching the storage service's pop receipt rotation
        entry.lease_token = Some(Uuid::new_v4().to_string());
        Ok(())
    }
}
