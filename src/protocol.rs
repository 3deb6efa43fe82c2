//! Kernel-facing structures, already decoded.
//!
//! These mirror what the userspace filesystem protocol hands to and expects
//! from a path-based filesystem: `struct stat`, `struct statvfs`,
//! `struct fuse_file_info`, the `utimens` time pair and the directory filler.
//! Encoding them into the wire format is the protocol layer's job.

use crate::FileType;

/// Seconds and nanoseconds since the Unix epoch. Negative `sec` is before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespec {
    /// Whole seconds.
    pub sec: i64,
    /// Nanoseconds within the second, always `< 1_000_000_000`.
    pub nsec: u32,
}

/// `struct stat` as filled by `getattr`/`fgetattr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    /// Type and permission bits (`S_IFMT | 0o7777`).
    pub st_mode: u32,
    /// Inode number.
    pub st_ino: u64,
    /// Number of hard links.
    pub st_nlink: u64,
    /// Owner user id.
    pub st_uid: u32,
    /// Owner group id.
    pub st_gid: u32,
    /// Size in bytes.
    pub st_size: u64,
    /// Allocated 512-byte blocks.
    pub st_blocks: u64,
    /// Preferred I/O block size.
    pub st_blksize: u32,
    /// Last access.
    pub st_atime: Timespec,
    /// Last modification.
    pub st_mtime: Timespec,
    /// Last status change.
    pub st_ctime: Timespec,
}

/// `struct statvfs` as filled by `statfs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatVfs {
    /// Filesystem block size.
    pub f_bsize: u64,
    /// Fragment size.
    pub f_frsize: u64,
    /// Size of the filesystem in `f_frsize` units.
    pub f_blocks: u64,
    /// Free blocks.
    pub f_bfree: u64,
    /// Free blocks for unprivileged users.
    pub f_bavail: u64,
    /// Inodes.
    pub f_files: u64,
    /// Free inodes.
    pub f_ffree: u64,
    /// Free inodes for unprivileged users.
    pub f_favail: u64,
    /// Maximum filename length.
    pub f_namemax: u64,
}

/// Per-open state exchanged with the kernel (`struct fuse_file_info`).
///
/// `flags` carries the `open(2)` flags on the way in; `fh` carries the
/// bridge-assigned handle token on the way out of `open`/`create`/`opendir`
/// and back in on every later call for that descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// `O_*` flags from `open(2)`.
    pub flags: i32,
    /// Handle token.
    pub fh: u64,
}

impl FileInfo {
    /// File info for an open with the given `O_*` flags.
    pub fn with_flags(flags: i32) -> Self {
        Self { flags, fh: 0 }
    }
}

/// One half of a `utimens` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTime {
    /// `UTIME_OMIT`: leave the time unchanged.
    Omit,
    /// `UTIME_NOW`: use the current time.
    Now,
    /// An explicit time.
    At(Timespec),
}

/// Receives directory entries during `readdir`.
pub trait DirFiller {
    /// Add one entry. Returns `false` once the reply buffer is full, after
    /// which no further entries are offered.
    fn fill(&mut self, name: &str, file_type: FileType) -> bool;
}

impl DirFiller for Vec<(String, FileType)> {
    fn fill(&mut self, name: &str, file_type: FileType) -> bool {
        self.push((name.to_owned(), file_type));
        true
    }
}
