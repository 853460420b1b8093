use crate::classifier::{Classification, classify};
use crate::decoder::decode;
use crate::deferral::DeferralPolicy;
use crate::metrics_defs::{
    MESSAGE_FAILURES, MESSAGES_DEFERRED, MESSAGES_MATCHED, MESSAGES_RECEIVED, SCAN_DURATION,
};
use crate::queue::{MAX_PAGE_SIZE, MessageQueue, QueueError};
use crate::types::{CorrelationId, MatchedSet};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("could not create queue: {0}")]
    EnsureQueue(#[source] QueueError),
    #[error("could not receive messages: {0}")]
    Receive(#[source] QueueError),
}

/// Result of scanning one page.
#[derive(Debug, Default, PartialEq)]
pub struct ScanReport {
    pub matched: MatchedSet,
    /// Messages in the page.
    pub received: usize,
    pub deferred: usize,
    /// Deletes or deferrals that failed and were skipped.
    pub failures: usize,
}

/// Claims the messages of one correlation id from a single page of the queue
/// and pushes every other message out of sight for the deferral delay.
pub struct QueueScanner {
    queue: Arc<dyn MessageQueue>,
    policy: DeferralPolicy,
    page_size: u8,
}

impl QueueScanner {
    pub fn new(queue: Arc<dyn MessageQueue>, policy: DeferralPolicy, page_size: u8) -> Self {
        QueueScanner {
            queue,
            policy,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub async fn run(&self, correlation_id: &CorrelationId) -> Result<ScanReport, ScanError> {
        let start = Instant::now();

        self.queue
            .ensure_exists()
            .await
            .map_err(ScanError::EnsureQueue)?;

        let page = self
            .queue
            .receive_page(self.page_size)
            .await
            .map_err(ScanError::Receive)?;

        let mut report = ScanReport {
            received: page.len(),
            ..Default::default()
        };
        counter!(MESSAGES_RECEIVED).increment(page.len() as u64);

        if page.is_empty() {
            histogram!(SCAN_DURATION).record(start.elapsed().as_secs_f64());
            tracing::info!(%correlation_id, "Queue is empty");
            return Ok(report);
        }

        for message in page {
            let line = decode(&message.raw_body);
            let id = message.id().to_string();

            match classify(&line, correlation_id) {
                Classification::Matched => match self.queue.delete(message.handle).await {
                    Ok(()) => {
                        tracing::debug!(message_id = %id, "Claimed message");
                        counter!(MESSAGES_MATCHED).increment(1);
                        report.matched.push(line);
                    }
                    Err(e) => {
                        tracing::warn!(
                            message_id = %id,
                            error = %e,
                            "Failed to delete matched message"
                        );
                        counter!(MESSAGE_FAILURES).increment(1);
                        report.failures += 1;
                    }
                },
                Classification::Unmatched => {
                    let delay = self.policy.deferral_delay();
                    match self.queue.update_visibility(message.handle, delay).await {
                        Ok(()) => {
                            counter!(MESSAGES_DEFERRED).increment(1);
                            report.deferred += 1;
                        }
                        Err(e) => {
                            tracing::warn!(message_id = %id, error = %e, "Failed to defer message");
                            counter!(MESSAGE_FAILURES).increment(1);
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        histogram!(SCAN_DURATION).record(start.elapsed().as_secs_f64());
        tracing::info!(
            %correlation_id,
            received = report.received,
            matched = report.matched.len(),
            deferred = report.deferred,
            failures = report.failures,
            "Scanned queue page"
        );

        Ok(report)
    }
}
