//! Directory operations for virtual filesystems.

use std::path::Path;

use crate::{DirEntry, FsError, Permissions};

/// Directory operations for a virtual filesystem.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir: Send + Sync {
    /// List directory contents.
    ///
    /// Returns an iterator over directory entries. The outer `Result` indicates
    /// whether the directory could be opened; each item's `Result` indicates
    /// whether that specific entry could be read.
    ///
    /// Each call starts a fresh listing. `.` and `..` are not expected; the
    /// bridge adds them itself.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError>;

    /// Create a directory (parent must exist) with the given permissions.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if parent directory does not exist
    /// - [`FsError::AlreadyExists`] if the path already exists
    fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    /// - [`FsError::DirectoryNotEmpty`] if the directory is not empty
    fn remove_dir(&self, path: &Path) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// Wraps a boxed iterator for flexibility across different backends.
///
/// - Outer `Result` (from [`FsDir::read_dir`]) = "can I open this directory?"
/// - Inner `Result` (per item) = "can I read this entry?"
///
/// # Example
///
/// ```rust
/// use anyfs_mount::{FsDir, FsError};
/// use std::path::Path;
///
/// fn list_files<B: FsDir>(backend: &B) -> Result<Vec<String>, FsError> {
///     let mut names = Vec::new();
///     for entry in backend.read_dir(Path::new("/"))? {
///         let entry = entry?;
///         names.push(entry.name);
///     }
///     Ok(names)
/// }
/// ```
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    ///
    /// This is a convenience method equivalent to `iter.collect::<Result<Vec<_>, _>>()`.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
