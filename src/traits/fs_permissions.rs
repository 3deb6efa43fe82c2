//! Mode and ownership changes.

use std::path::Path;

use crate::{FsError, Permissions};

/// Mode and ownership changes (`chmod`, `chown`).
///
/// Reading permissions and owners is done via
/// [`FsLink::symlink_metadata`](super::FsLink::symlink_metadata).
pub trait FsPermissions: Send + Sync {
    /// Set permissions on a file or directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::PermissionDenied`] if the caller may not change the mode
    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError>;

    /// Change the owning user and/or group. `None` leaves that id unchanged.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotSupported`] if the backend has no notion of owners
    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError>;
}
