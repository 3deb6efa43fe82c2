//! Space usage.

use crate::{FsError, StatFs};

/// Filesystem-wide space and inode usage (`statfs`).
pub trait FsStats: Send + Sync {
    /// Get filesystem-level statistics.
    ///
    /// A `block_size` of 0 is accepted and reported to the kernel as 4096.
    ///
    /// # Errors
    ///
    /// - [`FsError::Backend`] for backend-specific failures
    fn statfs(&self) -> Result<StatFs, FsError>;
}
