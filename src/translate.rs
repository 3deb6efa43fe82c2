//! Attribute and error translation between the backend and the kernel.
//!
//! Everything here is pure: no locks, no I/O, no suspension.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use libc::c_int;

use crate::protocol::{DirFiller, FileStat, StatVfs, Timespec};
use crate::{AccessMode, DirEntry, FileType, FsError, Metadata, OpenFlags, Permissions, StatFs};

/// Preferred I/O size reported in `st_blksize`.
pub const IO_BLOCK_SIZE: u32 = 4096;

/// Block size reported by `statfs` when the backend leaves it at 0.
pub const DEFAULT_FRAGMENT_SIZE: u64 = 4096;

/// Name length reported by `statfs` when the backend leaves it at 0.
pub const DEFAULT_NAME_MAX: u64 = 255;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Map a backend failure onto a positive POSIX errno.
///
/// Total and deterministic: every variant has a fixed target, and anything
/// without a specific meaning is `EIO`.
pub fn errno(err: &FsError) -> c_int {
    match err {
        FsError::NotFound { .. } => libc::ENOENT,
        FsError::AlreadyExists { .. } => libc::EEXIST,
        FsError::NotAFile { .. } => libc::EISDIR,
        FsError::NotADirectory { .. } => libc::ENOTDIR,
        FsError::DirectoryNotEmpty { .. } => libc::ENOTEMPTY,
        FsError::NameTooLong { .. } => libc::ENAMETOOLONG,
        FsError::CrossDevice { .. } => libc::EXDEV,
        FsError::InvalidHandle { .. } => libc::EBADF,
        FsError::PermissionDenied { .. } | FsError::AccessDenied { .. } => libc::EACCES,
        FsError::ReadOnly { .. } => libc::EROFS,
        FsError::NoSpace { .. } => libc::ENOSPC,
        FsError::QuotaExceeded { .. } => libc::EDQUOT,
        FsError::FileSizeExceeded { .. } => libc::EFBIG,
        FsError::InvalidData { .. } => libc::EINVAL,
        FsError::NotSupported { .. } => libc::ENOSYS,
        FsError::Backend(_) => libc::EIO,
        FsError::Io { source, .. } => match source.raw_os_error() {
            Some(code) if code > 0 => code,
            _ => libc::EIO,
        },
    }
}

/// Encode a callback outcome as the kernel expects it.
///
/// Success is the byte count, saturated to `i32::MAX`. Failure is the
/// negated errno.
pub fn status(result: Result<usize, FsError>) -> i32 {
    match result {
        Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
        Err(err) => -errno(&err),
    }
}

/// `S_IF*` bits for a file type.
pub fn file_type_bits(file_type: FileType) -> u32 {
    let bits = match file_type {
        FileType::File => libc::S_IFREG,
        FileType::Directory => libc::S_IFDIR,
        FileType::Symlink => libc::S_IFLNK,
        FileType::Fifo => libc::S_IFIFO,
        FileType::Socket => libc::S_IFSOCK,
        FileType::CharDevice => libc::S_IFCHR,
        FileType::BlockDevice => libc::S_IFBLK,
    };
    bits as u32
}

/// File type encoded in a full `st_mode`, if the `S_IFMT` bits are known.
pub fn file_type_from_mode(mode: u32) -> Option<FileType> {
    let format = mode & libc::S_IFMT as u32;
    [
        FileType::File,
        FileType::Directory,
        FileType::Symlink,
        FileType::Fifo,
        FileType::Socket,
        FileType::CharDevice,
        FileType::BlockDevice,
    ]
    .into_iter()
    .find(|kind| file_type_bits(*kind) == format)
}

/// Convert a backend time to protocol resolution (nanoseconds).
pub fn timespec_from_system_time(time: SystemTime) -> Timespec {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => Timespec {
            sec: after.as_secs() as i64,
            nsec: after.subsec_nanos(),
        },
        Err(before) => {
            let before = before.duration();
            let mut sec = -(before.as_secs() as i64);
            let mut nsec = before.subsec_nanos();
            if nsec > 0 {
                sec -= 1;
                nsec = NANOS_PER_SEC - nsec;
            }
            Timespec { sec, nsec }
        }
    }
}

/// Convert a protocol time back to a `SystemTime`. Out-of-range values clamp
/// to the epoch.
pub fn system_time_from_timespec(ts: Timespec) -> SystemTime {
    let nanos = Duration::from_nanos(u64::from(ts.nsec.min(NANOS_PER_SEC - 1)));
    let whole = if ts.sec >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(ts.sec as u64))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(ts.sec.unsigned_abs()))
    };
    whole
        .and_then(|t| t.checked_add(nanos))
        .unwrap_or(UNIX_EPOCH)
}

/// Backend attribute record to `struct stat`.
pub fn metadata_to_stat(meta: &Metadata) -> FileStat {
    FileStat {
        st_mode: file_type_bits(meta.file_type) | meta.permissions.mode(),
        st_ino: meta.inode,
        st_nlink: meta.nlink.max(1),
        st_uid: meta.uid,
        st_gid: meta.gid,
        st_size: meta.size,
        st_blocks: meta.size.div_ceil(512),
        st_blksize: IO_BLOCK_SIZE,
        st_atime: timespec_from_system_time(meta.accessed),
        st_mtime: timespec_from_system_time(meta.modified),
        st_ctime: timespec_from_system_time(meta.changed),
    }
}

/// `struct stat` back to a backend attribute record.
///
/// Creation time is not carried by `struct stat`; it comes back as the
/// modification time. Unknown `S_IFMT` bits come back as a regular file.
pub fn stat_to_metadata(stat: &FileStat) -> Metadata {
    let modified = system_time_from_timespec(stat.st_mtime);
    Metadata {
        file_type: file_type_from_mode(stat.st_mode).unwrap_or(FileType::File),
        size: stat.st_size,
        permissions: Permissions::from_mode(stat.st_mode),
        uid: stat.st_uid,
        gid: stat.st_gid,
        created: modified,
        modified,
        accessed: system_time_from_timespec(stat.st_atime),
        changed: system_time_from_timespec(stat.st_ctime),
        inode: stat.st_ino,
        nlink: stat.st_nlink,
    }
}

/// Backend space usage to `struct statvfs`.
pub fn statfs_to_statvfs(stats: &StatFs) -> StatVfs {
    let block = if stats.block_size == 0 {
        DEFAULT_FRAGMENT_SIZE
    } else {
        stats.block_size
    };
    let available = stats.available_bytes / block;
    StatVfs {
        f_bsize: block,
        f_frsize: block,
        f_blocks: stats.total_bytes / block,
        f_bfree: available,
        f_bavail: available,
        f_files: stats.total_inodes,
        f_ffree: stats.available_inodes,
        f_favail: stats.available_inodes,
        f_namemax: if stats.max_name_len == 0 {
            DEFAULT_NAME_MAX
        } else {
            stats.max_name_len
        },
    }
}

/// Decode `open(2)` flags.
pub fn open_flags_from_posix(flags: i32) -> OpenFlags {
    let (read, write) = match flags & libc::O_ACCMODE {
        libc::O_WRONLY => (false, true),
        libc::O_RDWR => (true, true),
        _ => (true, false),
    };
    OpenFlags {
        read,
        write,
        create: flags & libc::O_CREAT != 0,
        exclusive: flags & libc::O_EXCL != 0,
        truncate: flags & libc::O_TRUNC != 0,
        append: flags & libc::O_APPEND != 0,
    }
}

/// Decode an `access(2)` mask.
pub fn access_mode_from_mask(mask: i32) -> AccessMode {
    AccessMode {
        read: mask & libc::R_OK != 0,
        write: mask & libc::W_OK != 0,
        execute: mask & libc::X_OK != 0,
    }
}

/// Deliver a listing to the kernel's filler.
///
/// `.` and `..` come first, then the backend entries in backend order.
/// Stops as soon as the filler reports a full buffer.
pub fn fill_directory(entries: &[DirEntry], filler: &mut dyn DirFiller) {
    let dots = [".", ".."].map(|name| (name, FileType::Directory));
    let listed = entries
        .iter()
        .map(|entry| (entry.name.as_str(), entry.file_type));
    for (name, file_type) in dots.into_iter().chain(listed) {
        if !filler.fill(name, file_type) {
            break;
        }
    }
}
