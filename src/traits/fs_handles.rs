//! Handle-based file I/O.
//!
//! The kernel reads and writes through open file descriptors, so the bridge
//! opens a backend resource once per `open`/`create` callback and keeps the
//! resulting [`Handle`] in its [`HandleTable`](crate::HandleTable) until the
//! matching `release`.
//!
//! # Example
//!
//! ```rust
//! use anyfs_mount::{FsHandles, OpenFlags, FsError, Permissions};
//! use std::path::Path;
//!
//! fn copy_via_handles<B: FsHandles>(
//!     backend: &B,
//!     src: &Path,
//!     dst: &Path,
//! ) -> Result<(), FsError> {
//!     let src_handle = backend.open(src, OpenFlags::READ, Permissions::default_file())?;
//!     let dst_handle = backend.open(dst, OpenFlags::WRITE, Permissions::default_file())?;
//!
//!     let mut buf = [0u8; 4096];
//!     let mut offset = 0;
//!     loop {
//!         let n = backend.read_at(src_handle, &mut buf, offset)?;
//!         if n == 0 {
//!             break;
//!         }
//!         backend.write_at(dst_handle, &buf[..n], offset)?;
//!         offset += n as u64;
//!     }
//!
//!     backend.close(src_handle)?;
//!     backend.close(dst_handle)?;
//!     Ok(())
//! }
//! ```

use std::path::Path;

use crate::{FsError, Handle, OpenFlags, Permissions};

/// Handle-based file operations.
///
/// # Handle Lifecycle
///
/// 1. Obtain a handle via [`open`](FsHandles::open)
/// 2. Perform operations with [`read_at`](FsHandles::read_at),
///    [`write_at`](FsHandles::write_at) and [`set_len`](FsHandles::set_len)
/// 3. Release the handle with [`close`](FsHandles::close)
///
/// Reads and writes are positional; the backend keeps no cursor.
pub trait FsHandles: Send + Sync {
    /// Open a file and return a handle.
    ///
    /// `perm` is applied only when the call creates the file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file doesn't exist and `create` is false
    /// - [`FsError::AlreadyExists`] if the file exists and `create` + `exclusive` are set
    /// - [`FsError::NotAFile`] if the path is a directory
    /// - [`FsError::PermissionDenied`] if access is denied
    fn open(&self, path: &Path, flags: OpenFlags, perm: Permissions) -> Result<Handle, FsError>;

    /// Read data from a file at a specific offset.
    ///
    /// Returns the number of bytes read, which may be less than `buf.len()`.
    /// Returns 0 at end of file.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    /// - [`FsError::PermissionDenied`] if the handle wasn't opened for reading
    fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError>;

    /// Write data to a file at a specific offset.
    ///
    /// Returns the number of bytes written, which may be less than `data.len()`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    /// - [`FsError::PermissionDenied`] if the handle wasn't opened for writing
    /// - [`FsError::NoSpace`] or [`FsError::QuotaExceeded`] if storage runs out
    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Resize the open file (`ftruncate`).
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn set_len(&self, handle: Handle, size: u64) -> Result<(), FsError>;

    /// Push buffered writes for this handle down to the backend store.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn flush(&self, handle: Handle) -> Result<(), FsError>;

    /// Close a file handle.
    ///
    /// After closing, the handle becomes invalid and must not be used.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is already closed or invalid
    fn close(&self, handle: Handle) -> Result<(), FsError>;
}
