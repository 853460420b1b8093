use crate::metrics_defs::ARCHIVES_WRITTEN;
use crate::store::{ObjectStore, StoreError};
use crate::types::{ArchiveRecord, CorrelationId, MatchedSet};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use shared::counter;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("could not create archive container: {0}")]
    EnsureContainer(#[source] StoreError),
    #[error("could not write archive {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, PartialEq)]
pub enum ArchiveOutcome {
    /// Nothing matched, so nothing was written.
    NoOp,
    Written(ArchiveRecord),
}

/// `<correlation id>_<yyyyMMdd_HHmmss>.txt`, UTC, second granularity.
pub fn archive_name(correlation_id: &CorrelationId, at: DateTime<Utc>) -> String {
    format!("{}_{}.txt", correlation_id, at.format("%Y%m%d_%H%M%S"))
}

/// Writes a matched set as a single object.
pub struct Archiver {
    store: Arc<dyn ObjectStore>,
}

impl Archiver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Archiver { store }
    }

    pub async fn archive(
        &self,
        correlation_id: &CorrelationId,
        matched: &MatchedSet,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        self.archive_at(correlation_id, matched, Utc::now()).await
    }

    pub async fn archive_at(
        &self,
        correlation_id: &CorrelationId,
        matched: &MatchedSet,
        now: DateTime<Utc>,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        if matched.is_empty() {
            return Ok(ArchiveOutcome::NoOp);
        }

        self.store
            .ensure_container_exists()
            .await
            .map_err(ArchiveError::EnsureContainer)?;

        let name = archive_name(correlation_id, now);
        let body = Bytes::from(matched.to_body());

        // Same-second archives for one correlation id replace each other.
        self.store
            .put(&name, body.clone(), true)
            .await
            .map_err(|source| ArchiveError::Write {
                name: name.clone(),
                source,
            })?;

        counter!(ARCHIVES_WRITTEN).increment(1);
        tracing::info!(
            %correlation_id,
            archive = %name,
            lines = matched.len(),
            "Wrote archive"
        );

        Ok(ArchiveOutcome::Written(ArchiveRecord {
            name,
            correlation_id: correlation_id.clone(),
            created_at: now,
            body,
        }))
    }
}
