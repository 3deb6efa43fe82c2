//! Error types for the mount bridge.
//!
//! Two families live here and they never mix:
//!
//! - [`FsError`] is what a backend returns. It is an expected, enumerated
//!   condition and is always translated into a POSIX errno by
//!   [`errno`](crate::translate::errno).
//! - [`DispatchError`] means the execution context could not run or finish a
//!   submitted callback. It aborts that single call with `EIO`.

use std::path::PathBuf;

/// Filesystem error type with comprehensive, contextual variants.
///
/// All error variants include relevant context (path, operation) where applicable.
/// Uses `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use anyfs_mount::FsError;
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("/missing") };
/// assert!(err.to_string().contains("/missing"));
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/File Errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a file but found a directory.
    #[error("not a file: {path}")]
    NotAFile {
        /// The path that is not a file.
        path: PathBuf,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: PathBuf,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: PathBuf,
    },

    /// A path component is longer than the backend accepts.
    #[error("name too long: {path}")]
    NameTooLong {
        /// The offending path.
        path: PathBuf,
    },

    /// Rename or link across backend boundaries.
    #[error("cross-device link: {from} -> {to}")]
    CrossDevice {
        /// The source path.
        from: PathBuf,
        /// The destination path.
        to: PathBuf,
    },

    /// File handle is invalid or closed.
    #[error("invalid handle: {}", handle.0)]
    InvalidHandle {
        /// The invalid handle.
        handle: crate::Handle,
    },

    // Permission/Access Errors
    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: PathBuf,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Access denied with reason.
    #[error("access denied: {path} ({reason})")]
    AccessDenied {
        /// The path where access was denied.
        path: PathBuf,
        /// The reason for denial.
        reason: String,
    },

    /// Filesystem is read-only.
    #[error("read-only filesystem: {operation}")]
    ReadOnly {
        /// The operation that was attempted.
        operation: &'static str,
    },

    // Resource Limit Errors
    /// No space left in the backend.
    #[error("no space left: {path}")]
    NoSpace {
        /// The path being written when space ran out.
        path: PathBuf,
    },

    /// Quota exceeded.
    #[error("quota exceeded: limit {limit}, requested {requested}, usage {usage}")]
    QuotaExceeded {
        /// The quota limit.
        limit: u64,
        /// The amount requested.
        requested: u64,
        /// The current usage.
        usage: u64,
    },

    /// File size limit exceeded.
    #[error("file size exceeded: {path} ({size} > {limit})")]
    FileSizeExceeded {
        /// The path to the file.
        path: PathBuf,
        /// The actual size.
        size: u64,
        /// The size limit.
        limit: u64,
    },

    // Data Errors
    /// Invalid data encountered (e.g. `read_link` on something that is not a link).
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path with invalid data.
        path: PathBuf,
        /// Details about the invalid data.
        details: String,
    },

    // Backend/Operation Errors
    /// Operation is not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// Generic backend error.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        // Convert common io::ErrorKind to more specific FsError variants when possible
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied {
                path: PathBuf::new(),
                operation: "io",
            },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path: PathBuf::new(),
                operation: "io",
            },
            std::io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::IsADirectory => FsError::NotAFile {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::NotADirectory => FsError::NotADirectory {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::StorageFull => FsError::NoSpace {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::Unsupported => FsError::NotSupported { operation: "io" },
            _ => FsError::Io {
                operation: "io",
                path: PathBuf::new(),
                source: error,
            },
        }
    }
}

/// The execution context failed to run or complete a submitted callback.
///
/// Never surfaced to the kernel as-is; the session turns it into `EIO` for
/// the affected call and keeps serving the others.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The executor was shut down before the work could be queued.
    #[error("{context} executor is shut down")]
    ShutDown {
        /// Which execution context refused the work.
        context: &'static str,
    },

    /// The work was accepted but its result never arrived (the job panicked
    /// or the worker went away).
    #[error("{operation}: worker dropped the result")]
    WorkerLost {
        /// The callback whose result was lost.
        operation: &'static str,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn {context} worker: {source}")]
    Spawn {
        /// Which execution context tried to grow.
        context: &'static str,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_error_not_found_display() {
        let err = FsError::NotFound {
            path: PathBuf::from("/missing"),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn fs_error_already_exists_display() {
        let err = FsError::AlreadyExists {
            path: PathBuf::from("/exists"),
            operation: "create",
        };
        assert_eq!(err.to_string(), "create: already exists: /exists");
    }

    #[test]
    fn fs_error_cross_device_display() {
        let err = FsError::CrossDevice {
            from: PathBuf::from("/a"),
            to: PathBuf::from("/mnt/b"),
        };
        assert_eq!(err.to_string(), "cross-device link: /a -> /mnt/b");
    }

    #[test]
    fn fs_error_from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::NotFound { .. }));
    }

    #[test]
    fn fs_error_from_io_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::PermissionDenied { .. }));
    }

    #[test]
    fn fs_error_from_io_directory_not_empty() {
        let io_err = std::io::Error::new(std::io::ErrorKind::DirectoryNotEmpty, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::DirectoryNotEmpty { .. }));
    }

    #[test]
    fn fs_error_from_io_other() {
        let io_err = std::io::Error::other("test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::Io { .. }));
    }

    #[test]
    fn dispatch_error_display() {
        let err = DispatchError::WorkerLost { operation: "read" };
        assert_eq!(err.to_string(), "read: worker dropped the result");

        let err = DispatchError::ShutDown { context: "serial" };
        assert_eq!(err.to_string(), "serial executor is shut down");
    }
}
