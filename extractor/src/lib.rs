pub mod api;
pub mod archiver;
pub mod azure;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod deferral;
pub mod metrics_defs;
pub mod notifier;
pub mod pipeline;
pub mod queue;
pub mod scanner;
pub mod store;
pub mod types;

#[cfg(test)]
mod testutils;

use crate::archiver::Archiver;
use crate::azure::{AzureError, SharedKeyClient, StorageAccount};
use crate::config::{ArchiveBackend, ArchiveConfig, QueueBackend, QueueConfig};
use crate::deferral::DeferralPolicy;
use crate::notifier::Notifier;
use crate::pipeline::Extraction;
use crate::queue::{AzureQueue, InMemoryQueue, MessageQueue, QueueError};
use crate::scanner::QueueScanner;
use crate::store::{AzureBlobStore, FilesystemStore, InMemoryStore, ObjectStore, StoreError};
use shared::admin_service::{AdminService, Readiness};
use shared::http::run_http_service;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ExtractorError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("azure storage error: {0}")]
    Azure(#[from] AzureError),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("object store error: {0}")]
    Store(#[from] StoreError),
    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub fn get_queue(config: &QueueConfig) -> Result<Arc<dyn MessageQueue>, AzureError> {
    let queue: Arc<dyn MessageQueue> = match &config.backend {
        QueueBackend::Memory => Arc::new(InMemoryQueue::new()),
        QueueBackend::Azure { connection_string } => {
            let account: StorageAccount = connection_string.parse()?;
            Arc::new(AzureQueue::new(SharedKeyClient::new(account), &config.name)?)
        }
    };
    Ok(queue)
}

pub fn get_store(config: &ArchiveConfig) -> Result<Arc<dyn ObjectStore>, AzureError> {
    let store: Arc<dyn ObjectStore> = match &config.backend {
        ArchiveBackend::Memory => Arc::new(InMemoryStore::new()),
        ArchiveBackend::Filesystem { base_dir } => {
            Arc::new(FilesystemStore::new(base_dir, &config.container))
        }
        ArchiveBackend::Azure { connection_string } => {
            let account: StorageAccount = connection_string.parse()?;
            Arc::new(AzureBlobStore::new(
                SharedKeyClient::new(account),
                &config.container,
            )?)
        }
    };
    Ok(store)
}

/// Serves the extraction API and the admin listener. The service reports
/// ready once the queue and the archive container are known to exist.
pub async fn run(config: config::Config) -> Result<(), ExtractorError> {
    let queue = get_queue(&config.queue)?;
    let store = get_store(&config.archive)?;
    let notifier = match &config.notification {
        Some(n) => Some(Notifier::new(
            n.url.clone(),
            n.download_location.clone(),
            n.timeout(),
        )?),
        None => {
            tracing::info!("No notification receiver configured, notifications are disabled");
            None
        }
    };

    let extraction = Extraction::new(
        QueueScanner::new(
            queue.clone(),
            DeferralPolicy::new(config.queue.deferral_delay()),
            config.queue.page_size,
        ),
        Archiver::new(store.clone()),
        notifier,
    );

    let readiness = Readiness::new();
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<ExtractorError>::new(readiness.clone()),
    );
    let api_task = async {
        api::serve(&config.listener, extraction).await?;
        Ok::<_, ExtractorError>(())
    };
    let startup_task = async {
        queue.ensure_exists().await?;
        store.ensure_container_exists().await?;
        readiness.set_ready(true);
        tracing::info!(
            queue = %config.queue.name,
            container = %config.archive.container,
            "Extractor ready"
        );
        Ok::<_, ExtractorError>(())
    };

    tokio::try_join!(api_task, admin_task, startup_task)?;
    Ok(())
}
