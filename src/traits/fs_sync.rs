//! Durability requests.

use std::path::Path;

use crate::FsError;

/// Durability requests forwarded from `fsync`/`fsyncdir`.
///
/// Backends without a durable store can return `Ok(())` from both.
pub trait FsSync: Send + Sync {
    /// Sync all pending changes to persistent storage.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] for underlying I/O errors
    fn sync(&self) -> Result<(), FsError>;

    /// Sync a specific file's or directory's data and metadata to storage.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::Io`] for underlying I/O errors
    fn fsync(&self, path: &Path) -> Result<(), FsError>;
}
