//! Attribute queries.

use std::path::Path;

use crate::{AccessMode, FsError, Metadata};

/// Read-side attribute queries for a mounted filesystem.
///
/// These are the only backend calls the bridge runs in parallel with
/// everything else, so implementations must return a consistent snapshot of
/// a single node without taking tree-wide locks for long.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access. Backends should use interior mutability (`RwLock`, `Mutex`)
/// for thread-safe state management.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Get metadata for a path (follows symlinks).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError>;

    /// Check whether the caller may access `path` in the given mode.
    ///
    /// [`AccessMode::EXISTS`] only checks that the path resolves.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::PermissionDenied`] if the requested access is not allowed
    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError>;
}
