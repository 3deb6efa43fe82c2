//! Symlinks, hard links and `lstat`.

use std::path::{Path, PathBuf};

use crate::{FsError, Metadata};

/// Link operations.
///
/// `getattr` on a mount must describe the link itself, so the bridge calls
/// [`symlink_metadata`](FsLink::symlink_metadata) for every path stat and
/// only uses [`FsRead::metadata`](super::FsRead::metadata) once a file has
/// been opened.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsLink`.
pub trait FsLink: Send + Sync {
    /// Create a symbolic link at `link` whose content is `target`.
    ///
    /// `target` is stored verbatim and does not need to exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `link` already exists
    /// - [`FsError::NotFound`] if parent of `link` does not exist
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError>;

    /// Create a hard link `link` to the existing file `original`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `original` does not exist
    /// - [`FsError::NotAFile`] if `original` is a directory
    /// - [`FsError::AlreadyExists`] if `link` already exists
    /// - [`FsError::CrossDevice`] if the two paths live on different stores
    fn hard_link(&self, original: &Path, link: &Path) -> Result<(), FsError>;

    /// Read the raw target of a symbolic link.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::InvalidData`] if `path` is not a symlink
    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError>;

    /// Get metadata without following symlinks.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError>;
}
