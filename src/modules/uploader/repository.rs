use tokio::sync::OwnedMutexGuard;

use crate::{api::error, modules::uploader::model::MediaLocation};

#[async_trait::async_trait]
pub trait MediaStore {
    /// Whether a regular file exists at the location.
    async fn exists(&self, location: &MediaLocation) -> Result<bool, error::SystemError>;

    async fn read(&self, location: &MediaLocation) -> Result<Vec<u8>, error::SystemError>;

    /// Replaces the file atomically; readers see either the old or the new
    /// content, never a partial write.
    async fn write(&self, location: &MediaLocation, bytes: &[u8]) -> Result<u64, error::SystemError>;

    async fn remove(&self, location: &MediaLocation) -> Result<(), error::SystemError>;

    /// Serializes mutations of one location. Released on drop.
    async fn lock(&self, location: &MediaLocation) -> OwnedMutexGuard<()>;
}
