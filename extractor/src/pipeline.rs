//! One extraction invocation: validate, scan, archive, notify.
use crate::archiver::{ArchiveError, ArchiveOutcome, Archiver};
use crate::notifier::{NotificationOutcome, Notifier};
use crate::scanner::{QueueScanner, ScanError};
use crate::types::{ArchiveRecord, CorrelationId, CorrelationIdError};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error(transparent)]
    InvalidInput(#[from] CorrelationIdError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, PartialEq)]
pub enum ExtractionOutcome {
    QueueEmpty,
    NoMatches {
        received: usize,
    },
    Archived {
        record: ArchiveRecord,
        matched: usize,
        notification: NotificationOutcome,
    },
}

/// Holds no state between invocations. Cheap to clone.
#[derive(Clone)]
pub struct Extraction {
    scanner: Arc<QueueScanner>,
    archiver: Arc<Archiver>,
    notifier: Option<Arc<Notifier>>,
}

impl Extraction {
    pub fn new(scanner: QueueScanner, archiver: Archiver, notifier: Option<Notifier>) -> Self {
        Extraction {
            scanner: Arc::new(scanner),
            archiver: Arc::new(archiver),
            notifier: notifier.map(Arc::new),
        }
    }

    /// A missing or empty correlation id fails before the queue is touched.
    pub async fn run(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let correlation_id = CorrelationId::new(correlation_id.unwrap_or_default())?;

        let report = self.scanner.run(&correlation_id).await?;
        if report.received == 0 {
            return Ok(ExtractionOutcome::QueueEmpty);
        }
        if report.matched.is_empty() {
            return Ok(ExtractionOutcome::NoMatches {
                received: report.received,
            });
        }

        let record = match self.archiver.archive(&correlation_id, &report.matched).await? {
            ArchiveOutcome::Written(record) => record,
            ArchiveOutcome::NoOp => {
                return Ok(ExtractionOutcome::NoMatches {
                    received: report.received,
                });
            }
        };

        let notification = match &self.notifier {
            Some(notifier) => notifier.notify(&notifier.event_for(&record)).await,
            None => NotificationOutcome::Disabled,
        };

        Ok(ExtractionOutcome::Archived {
            record,
            matched: report.matched.len(),
            notification,
        })
    }
}
