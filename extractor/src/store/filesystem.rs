use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Stores each object as a file under `<base_dir>/<container>/`.
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(base_dir: &str, container: &str) -> Self {
        FilesystemStore {
            dir: Path::new(base_dir).join(container),
        }
    }

    // Object names come from caller supplied correlation ids and must not
    // escape the container directory.
    fn object_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let escapes = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if escapes {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn ensure_container_exists(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn put(&self, name: &str, body: Bytes, overwrite: bool) -> Result<(), StoreError> {
        let path = self.object_path(name)?;

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = match options.open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&body).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), bytes = body.len(), "Stored object");
        Ok(())
    }
}
