//! # Backend Contract
//!
//! What a virtual filesystem must implement to be mounted.
//!
//! The contract is split into small component traits, one per concern, and
//! combined by the [`FsMount`] composite:
//!
//! | Trait | Covers | Kernel callbacks served |
//! |-------|--------|-------------------------|
//! | [`FsRead`] | attribute query, access check | `fgetattr`, `access` |
//! | [`FsWrite`] | remove, rename, truncate | `unlink`, `rename`, `truncate` |
//! | [`FsDir`] | listing, mkdir, rmdir | `readdir`, `mkdir`, `rmdir` |
//! | [`FsLink`] | symlinks, hard links, `lstat` | `getattr`, `readlink`, `symlink`, `link` |
//! | [`FsPermissions`] | mode and owner | `chmod`, `chown` |
//! | [`FsTimes`] | timestamps | `utimens` |
//! | [`FsStats`] | space usage | `statfs` |
//! | [`FsSync`] | durability | `fsync`, `fsyncdir` |
//! | [`FsHandles`] | open/close, positional I/O | `open`, `create`, `mknod`, `read`, `write`, `ftruncate`, `flush`, `release` |
//!
//! ## Blanket Implementation
//!
//! Implement the components and you get [`FsMount`] for free.
//!
//! ## Failures
//!
//! Every method returns `Result<_, FsError>`. Backends report expected
//! conditions through the matching [`FsError`](crate::FsError) variant;
//! anything else should be [`FsError::Backend`](crate::FsError::Backend),
//! which the bridge reports as `EIO`.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`. The bridge calls
//! attribute queries in parallel with each other and with one serialized
//! operation at a time, so backends use interior mutability.

mod fs_dir;
mod fs_handles;
mod fs_link;
mod fs_permissions;
mod fs_read;
mod fs_stats;
mod fs_sync;
mod fs_times;
mod fs_write;

pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_handles::FsHandles;
pub use fs_link::FsLink;
pub use fs_permissions::FsPermissions;
pub use fs_read::FsRead;
pub use fs_stats::FsStats;
pub use fs_sync::FsSync;
pub use fs_times::FsTimes;
pub use fs_write::FsWrite;

/// A backend that can be mounted.
///
/// Combines every component trait the callback set needs.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type implementing all component traits.
///
/// # Example
///
/// ```rust
/// use anyfs_mount::{FsMount, FsError, OpenFlags, Permissions};
/// use std::path::Path;
///
/// fn touch<B: FsMount>(fs: &B, path: &Path) -> Result<(), FsError> {
///     let handle = fs.open(path, OpenFlags::WRITE, Permissions::default_file())?;
///     fs.close(handle)?;
///     let meta = fs.symlink_metadata(path)?;
///     assert!(meta.is_file());
///     Ok(())
/// }
/// ```
pub trait FsMount:
    FsRead + FsWrite + FsDir + FsLink + FsPermissions + FsTimes + FsStats + FsSync + FsHandles
{
}

impl<T> FsMount for T where
    T: FsRead
        + FsWrite
        + FsDir
        + FsLink
        + FsPermissions
        + FsTimes
        + FsStats
        + FsSync
        + FsHandles
{
}
