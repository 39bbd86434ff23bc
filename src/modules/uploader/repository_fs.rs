use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    api::error,
    modules::uploader::{model::MediaLocation, repository::MediaStore},
};

type PathLocks = HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>;

/// Media store backed by a directory tree `{base_path}/{folder}/{filename}`.
#[derive(Clone)]
pub struct LocalMediaStore {
    base_path: PathBuf,
    locks: Arc<Mutex<PathLocks>>,
}

impl LocalMediaStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into(), locks: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn path_of(&self, location: &MediaLocation) -> PathBuf {
        self.base_path.join(location.relative_path())
    }

    fn temp_path(path: &Path, location: &MediaLocation) -> PathBuf {
        path.with_file_name(format!(".{}.{}.tmp", location.filename(), Uuid::now_v7()))
    }

    async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaStore for LocalMediaStore {
    async fn exists(&self, location: &MediaLocation) -> Result<bool, error::SystemError> {
        match tokio::fs::metadata(self.path_of(location)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, location: &MediaLocation) -> Result<Vec<u8>, error::SystemError> {
        tokio::fs::read(self.path_of(location)).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => error::SystemError::not_found(location.filename().to_string()),
            _ => e.into(),
        })
    }

    async fn write(&self, location: &MediaLocation, bytes: &[u8]) -> Result<u64, error::SystemError> {
        let path = self.path_of(location);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = Self::temp_path(&path, location);
        let written = match Self::write_file(&temp, bytes).await {
            Ok(()) => tokio::fs::rename(&temp, &path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %temp.display(), "Failed to remove temporary file: {}", cleanup);
                }
            }
            return Err(e.into());
        }

        tracing::info!(path = %path.display(), size_bytes = bytes.len(), "Stored media file");
        Ok(bytes.len() as u64)
    }

    async fn remove(&self, location: &MediaLocation) -> Result<(), error::SystemError> {
        let path = self.path_of(location);
        tokio::fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => error::SystemError::not_found(location.filename().to_string()),
            _ => e.into(),
        })?;

        tracing::info!(path = %path.display(), "Removed media file");
        Ok(())
    }

    async fn lock(&self, location: &MediaLocation) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the table are idle.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks.entry(self.path_of(location)).or_default().clone()
        };
        mutex.lock_owned().await
    }
}
