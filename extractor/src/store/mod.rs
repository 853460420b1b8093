//! Object stores the archiver writes to.
mod azure;
mod filesystem;
mod memory;

pub use azure::AzureBlobStore;
pub use filesystem::FilesystemStore;
pub use memory::InMemoryStore;

use crate::azure::AzureError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("invalid object name: {0}")]
    InvalidName(String),
    #[error("object {0} already exists")]
    AlreadyExists(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("azure storage error: {0}")]
    Azure(#[from] AzureError),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Idempotent create of the destination container.
    async fn ensure_container_exists(&self) -> Result<(), StoreError>;

    /// Writes one named object. With `overwrite` unset an existing object
    /// of the same name is an error.
    async fn put(&self, name: &str, body: Bytes, overwrite: bool) -> Result<(), StoreError>;
}
