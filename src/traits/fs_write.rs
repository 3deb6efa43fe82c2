//! Path-addressed mutations of files.

use std::path::Path;

use crate::FsError;

/// Path-addressed mutations for a mounted filesystem.
///
/// Creating files goes through [`FsHandles::open`](super::FsHandles::open)
/// with `create` set; this trait covers the remaining structural changes.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access. Backends should use interior mutability (`RwLock`, `Mutex`)
/// for thread-safe state management.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Remove a file or symlink.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file does not exist
    /// - [`FsError::NotAFile`] if the path is a directory (use [`FsDir::remove_dir`](super::FsDir::remove_dir))
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Rename/move a file or directory.
    ///
    /// This operation should be atomic where possible.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source path does not exist
    /// - [`FsError::CrossDevice`] if source and destination live on different stores
    /// - [`FsError::DirectoryNotEmpty`] if the destination is a non-empty directory
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Truncate a file to the specified size.
    ///
    /// If the file is larger than `size`, the extra data is discarded.
    /// If the file is smaller, it is extended with zero bytes.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    fn truncate(&self, path: &Path, size: u64) -> Result<(), FsError>;
}
