//! # Callback Set
//!
//! [`OpKind`] names every callback the kernel can issue, and
//! [`FuseOperations`] is the synchronous, path-based interface the protocol
//! layer calls into.
//!
//! ## Classification
//!
//! | Class | Callbacks |
//! |-------|-----------|
//! | [`OpClass::Concurrent`] | `getattr`, `fgetattr`, `access` |
//! | [`OpClass::Serialized`] | everything else |
//!
//! Concurrent callbacks only read one node's attributes and never open or
//! change anything. Serialized callbacks run one at a time in arrival order
//! across the whole mount, which keeps the history of the tree and of every
//! open handle linear.

use std::path::Path;

use crate::protocol::{DirFiller, FileInfo, FileStat, SetTime, StatVfs};

/// How a callback may be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// May run alongside any other callback.
    Concurrent,
    /// Runs strictly one at a time, FIFO, relative to all other serialized callbacks.
    Serialized,
}

/// Every callback the kernel can issue.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Getattr,
    Fgetattr,
    Access,
    Readlink,
    Mknod,
    Mkdir,
    Unlink,
    Rmdir,
    Symlink,
    Rename,
    Link,
    Chmod,
    Chown,
    Truncate,
    Ftruncate,
    Open,
    Read,
    Write,
    Statfs,
    Flush,
    Release,
    Fsync,
    Opendir,
    Readdir,
    Releasedir,
    Fsyncdir,
    Create,
    Utimens,
}

impl OpKind {
    /// All callbacks, in protocol order.
    pub const ALL: [OpKind; 28] = [
        OpKind::Getattr,
        OpKind::Readlink,
        OpKind::Mknod,
        OpKind::Mkdir,
        OpKind::Unlink,
        OpKind::Rmdir,
        OpKind::Symlink,
        OpKind::Rename,
        OpKind::Link,
        OpKind::Chmod,
        OpKind::Chown,
        OpKind::Truncate,
        OpKind::Open,
        OpKind::Read,
        OpKind::Write,
        OpKind::Statfs,
        OpKind::Flush,
        OpKind::Release,
        OpKind::Fsync,
        OpKind::Opendir,
        OpKind::Readdir,
        OpKind::Releasedir,
        OpKind::Fsyncdir,
        OpKind::Access,
        OpKind::Create,
        OpKind::Ftruncate,
        OpKind::Fgetattr,
        OpKind::Utimens,
    ];

    /// Scheduling class of this callback.
    pub const fn class(self) -> OpClass {
        match self {
            OpKind::Getattr | OpKind::Fgetattr | OpKind::Access => OpClass::Concurrent,
            OpKind::Readlink
            | OpKind::Mknod
            | OpKind::Mkdir
            | OpKind::Unlink
            | OpKind::Rmdir
            | OpKind::Symlink
            | OpKind::Rename
            | OpKind::Link
            | OpKind::Chmod
            | OpKind::Chown
            | OpKind::Truncate
            | OpKind::Ftruncate
            | OpKind::Open
            | OpKind::Read
            | OpKind::Write
            | OpKind::Statfs
            | OpKind::Flush
            | OpKind::Release
            | OpKind::Fsync
            | OpKind::Opendir
            | OpKind::Readdir
            | OpKind::Releasedir
            | OpKind::Fsyncdir
            | OpKind::Create
            | OpKind::Utimens => OpClass::Serialized,
        }
    }

    /// Returns `true` for callbacks that change the tree, a node's
    /// attributes, or file contents.
    pub const fn is_mutating(self) -> bool {
        matches!(
            self,
            OpKind::Mknod
                | OpKind::Mkdir
                | OpKind::Unlink
                | OpKind::Rmdir
                | OpKind::Symlink
                | OpKind::Rename
                | OpKind::Link
                | OpKind::Chmod
                | OpKind::Chown
                | OpKind::Truncate
                | OpKind::Ftruncate
                | OpKind::Write
                | OpKind::Create
                | OpKind::Utimens
        )
    }

    /// Protocol name of the callback, used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            OpKind::Getattr => "getattr",
            OpKind::Fgetattr => "fgetattr",
            OpKind::Access => "access",
            OpKind::Readlink => "readlink",
            OpKind::Mknod => "mknod",
            OpKind::Mkdir => "mkdir",
            OpKind::Unlink => "unlink",
            OpKind::Rmdir => "rmdir",
            OpKind::Symlink => "symlink",
            OpKind::Rename => "rename",
            OpKind::Link => "link",
            OpKind::Chmod => "chmod",
            OpKind::Chown => "chown",
            OpKind::Truncate => "truncate",
            OpKind::Ftruncate => "ftruncate",
            OpKind::Open => "open",
            OpKind::Read => "read",
            OpKind::Write => "write",
            OpKind::Statfs => "statfs",
            OpKind::Flush => "flush",
            OpKind::Release => "release",
            OpKind::Fsync => "fsync",
            OpKind::Opendir => "opendir",
            OpKind::Readdir => "readdir",
            OpKind::Releasedir => "releasedir",
            OpKind::Fsyncdir => "fsyncdir",
            OpKind::Create => "create",
            OpKind::Utimens => "utimens",
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The path-based callback interface the protocol layer drives.
///
/// Every method runs synchronously on the calling kernel thread and returns
/// `0` (or a byte count for `read`/`write`) on success and `-errno` on
/// failure. Out-parameters are written only on success.
///
/// Implemented by [`MountSession`](crate::MountSession) and by decorators
/// such as [`ReadOnlyView`](crate::ReadOnlyView).
pub trait FuseOperations: Send + Sync {
    /// Stat a path without following a final symlink.
    fn getattr(&self, path: &Path, stat: &mut FileStat) -> i32;

    /// Copy a symlink's target into `buf`, NUL-terminated and truncated to fit.
    fn readlink(&self, path: &Path, buf: &mut [u8]) -> i32;

    /// Create a node. Only regular files are supported.
    fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> i32;

    /// Create a directory.
    fn mkdir(&self, path: &Path, mode: u32) -> i32;

    /// Remove a file or symlink.
    fn unlink(&self, path: &Path) -> i32;

    /// Remove an empty directory.
    fn rmdir(&self, path: &Path) -> i32;

    /// Create a symlink at `link` pointing to `target`.
    fn symlink(&self, target: &Path, link: &Path) -> i32;

    /// Rename `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> i32;

    /// Create a hard link `link` to `original`.
    fn link(&self, original: &Path, link: &Path) -> i32;

    /// Change permission bits.
    fn chmod(&self, path: &Path, mode: u32) -> i32;

    /// Change owner. `u32::MAX` leaves that id unchanged.
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> i32;

    /// Resize a file by path.
    fn truncate(&self, path: &Path, size: u64) -> i32;

    /// Open a file; sets `fi.fh` on success.
    fn open(&self, path: &Path, fi: &mut FileInfo) -> i32;

    /// Read into `buf` at `offset`; returns the byte count.
    fn read(&self, path: &Path, buf: &mut [u8], offset: u64, fi: &FileInfo) -> i32;

    /// Write `data` at `offset`; returns the byte count.
    fn write(&self, path: &Path, data: &[u8], offset: u64, fi: &FileInfo) -> i32;

    /// Report space usage.
    fn statfs(&self, path: &Path, stat: &mut StatVfs) -> i32;

    /// Called on every `close(2)` of a descriptor.
    fn flush(&self, path: &Path, fi: &FileInfo) -> i32;

    /// Last close of an open file; frees `fi.fh`.
    fn release(&self, path: &Path, fi: &FileInfo) -> i32;

    /// Sync file contents (`datasync` = data only).
    fn fsync(&self, path: &Path, datasync: bool, fi: &FileInfo) -> i32;

    /// Open a directory; sets `fi.fh` on success.
    fn opendir(&self, path: &Path, fi: &mut FileInfo) -> i32;

    /// List a directory into `filler`.
    fn readdir(&self, path: &Path, fi: &FileInfo, filler: &mut dyn DirFiller) -> i32;

    /// Close a directory; frees `fi.fh`.
    fn releasedir(&self, path: &Path, fi: &FileInfo) -> i32;

    /// Sync directory contents.
    fn fsyncdir(&self, path: &Path, datasync: bool, fi: &FileInfo) -> i32;

    /// Check access with an `R_OK | W_OK | X_OK` mask (`F_OK` = 0).
    fn access(&self, path: &Path, mask: i32) -> i32;

    /// Create and open a file; sets `fi.fh` on success.
    fn create(&self, path: &Path, mode: u32, fi: &mut FileInfo) -> i32;

    /// Resize an open file.
    fn ftruncate(&self, path: &Path, size: u64, fi: &FileInfo) -> i32;

    /// Stat an open file.
    fn fgetattr(&self, path: &Path, stat: &mut FileStat, fi: &FileInfo) -> i32;

    /// Set access and modification times.
    fn utimens(&self, path: &Path, atime: SetTime, mtime: SetTime) -> i32;
}
