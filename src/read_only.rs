//! # Read-Only View
//!
//! [`ReadOnlyView`] fronts any [`FuseOperations`] and refuses every callback
//! that would change the tree, a node's attributes or file contents, before
//! it reaches the inner surface. Refusals are `-EACCES` regardless of what
//! the backend underneath could do.
//!
//! `open` is refused as well when its flags ask for write access, creation,
//! truncation or appending. Everything else is forwarded unchanged.

use std::path::Path;

use tracing::debug;

use crate::layer::Layer;
use crate::ops::{FuseOperations, OpKind};
use crate::protocol::{DirFiller, FileInfo, FileStat, SetTime, StatVfs};
use crate::translate;

const DENIED: i32 = -libc::EACCES;

/// Read-only decorator over a callback surface.
pub struct ReadOnlyView<S> {
    inner: S,
}

impl<S: FuseOperations> ReadOnlyView<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped surface.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn deny(&self, kind: OpKind, path: &Path) -> i32 {
        debug_assert!(kind.is_mutating() || kind == OpKind::Open);
        debug!(op = kind.name(), path = %path.display(), "refused on read-only mount");
        DENIED
    }
}

/// Applies [`ReadOnlyView`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyLayer;

impl<S: FuseOperations> Layer<S> for ReadOnlyLayer {
    type Service = ReadOnlyView<S>;

    fn layer(self, inner: S) -> Self::Service {
        ReadOnlyView::new(inner)
    }
}

impl<S: FuseOperations> FuseOperations for ReadOnlyView<S> {
    fn getattr(&self, path: &Path, stat: &mut FileStat) -> i32 {
        self.inner.getattr(path, stat)
    }

    fn readlink(&self, path: &Path, buf: &mut [u8]) -> i32 {
        self.inner.readlink(path, buf)
    }

    fn mknod(&self, path: &Path, _mode: u32, _rdev: u64) -> i32 {
        self.deny(OpKind::Mknod, path)
    }

    fn mkdir(&self, path: &Path, _mode: u32) -> i32 {
        self.deny(OpKind::Mkdir, path)
    }

    fn unlink(&self, path: &Path) -> i32 {
        self.deny(OpKind::Unlink, path)
    }

    fn rmdir(&self, path: &Path) -> i32 {
        self.deny(OpKind::Rmdir, path)
    }

    fn symlink(&self, _target: &Path, link: &Path) -> i32 {
        self.deny(OpKind::Symlink, link)
    }

    fn rename(&self, from: &Path, _to: &Path) -> i32 {
        self.deny(OpKind::Rename, from)
    }

    fn link(&self, _original: &Path, link: &Path) -> i32 {
        self.deny(OpKind::Link, link)
    }

    fn chmod(&self, path: &Path, _mode: u32) -> i32 {
        self.deny(OpKind::Chmod, path)
    }

    fn chown(&self, path: &Path, _uid: u32, _gid: u32) -> i32 {
        self.deny(OpKind::Chown, path)
    }

    fn truncate(&self, path: &Path, _size: u64) -> i32 {
        self.deny(OpKind::Truncate, path)
    }

    fn open(&self, path: &Path, fi: &mut FileInfo) -> i32 {
        if translate::open_flags_from_posix(fi.flags).mutates() {
            return self.deny(OpKind::Open, path);
        }
        self.inner.open(path, fi)
    }

    fn read(&self, path: &Path, buf: &mut [u8], offset: u64, fi: &FileInfo) -> i32 {
        self.inner.read(path, buf, offset, fi)
    }

    fn write(&self, path: &Path, _data: &[u8], _offset: u64, _fi: &FileInfo) -> i32 {
        self.deny(OpKind::Write, path)
    }

    fn statfs(&self, path: &Path, stat: &mut StatVfs) -> i32 {
        self.inner.statfs(path, stat)
    }

    fn flush(&self, path: &Path, fi: &FileInfo) -> i32 {
        self.inner.flush(path, fi)
    }

    fn release(&self, path: &Path, fi: &FileInfo) -> i32 {
        self.inner.release(path, fi)
    }

    fn fsync(&self, path: &Path, datasync: bool, fi: &FileInfo) -> i32 {
        self.inner.fsync(path, datasync, fi)
    }

    fn opendir(&self, path: &Path, fi: &mut FileInfo) -> i32 {
        self.inner.opendir(path, fi)
    }

    fn readdir(&self, path: &Path, fi: &FileInfo, filler: &mut dyn DirFiller) -> i32 {
        self.inner.readdir(path, fi, filler)
    }

    fn releasedir(&self, path: &Path, fi: &FileInfo) -> i32 {
        self.inner.releasedir(path, fi)
    }

    fn fsyncdir(&self, path: &Path, datasync: bool, fi: &FileInfo) -> i32 {
        self.inner.fsyncdir(path, datasync, fi)
    }

    fn access(&self, path: &Path, mask: i32) -> i32 {
        self.inner.access(path, mask)
    }

    fn create(&self, path: &Path, _mode: u32, _fi: &mut FileInfo) -> i32 {
        self.deny(OpKind::Create, path)
    }

    fn ftruncate(&self, path: &Path, _size: u64, _fi: &FileInfo) -> i32 {
        self.deny(OpKind::Ftruncate, path)
    }

    fn fgetattr(&self, path: &Path, stat: &mut FileStat, fi: &FileInfo) -> i32 {
        self.inner.fgetattr(path, stat, fi)
    }

    fn utimens(&self, path: &Path, _atime: SetTime, _mtime: SetTime) -> i32 {
        self.deny(OpKind::Utimens, path)
    }
}
