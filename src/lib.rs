//! # anyfs-mount
//!
//! Bridges the kernel's userspace-filesystem callbacks onto a pluggable
//! virtual filesystem backend.
//!
//! The protocol layer (whatever decodes kernel requests) calls one method of
//! [`FuseOperations`] per request, synchronously, on its own thread. This
//! crate decides where the work runs, calls the backend, translates the
//! answer into POSIX structures and errno codes, and keeps track of open
//! handles. It does not talk to the kernel itself.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use anyfs_mount::{mount, FileStat, FuseOperations, MountOptions};
//! use std::{path::Path, sync::Arc};
//!
//! let ops = mount(Arc::new(MyBackend::new()), MountOptions::default())?;
//! let mut stat = FileStat::default();
//! assert_eq!(ops.getattr(Path::new("/"), &mut stat), 0);
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FsMount`] | What a backend implements (blanket over the component traits) |
//! | [`FuseOperations`] | The callback surface handed to the protocol layer |
//! | [`MountSession`] | Owns the executors and the handle table for one mount |
//! | [`ReadOnlyView`] | Refuses every mutating callback with `EACCES` |
//! | [`HandleTable`] | Kernel handle tokens to open backend resources |
//! | [`FsError`] | Backend failures, mapped onto errno by [`translate::errno`] |
//! | [`DispatchError`] | Work that could not run or finish, reported as `EIO` |
//!
//! ---
//!
//! ## Concurrency
//!
//! | Class | Callbacks | Runs on |
//! |-------|-----------|---------|
//! | Concurrent | `getattr`, `fgetattr`, `access` | cached pool, never queued |
//! | Serialized | everything else | one worker thread, FIFO |
//!
//! Serialized callbacks never overlap, whichever paths they touch, so the
//! history of the tree and of every open handle is linear. The calling
//! thread blocks until its own result comes back. See [`OpKind::class`].
//!
//! ---
//!
//! ## Errors
//!
//! Backends return `Result<T, FsError>`. Every variant has a fixed errno:
//!
//! ```rust
//! use anyfs_mount::{FsError, translate};
//! use std::path::PathBuf;
//!
//! let err = FsError::DirectoryNotEmpty { path: PathBuf::from("/d") };
//! assert_eq!(translate::errno(&err), libc::ENOTEMPTY);
//! ```
//!
//! A panic inside backend code aborts only that callback (`EIO`); later
//! callbacks keep running in order.
//!
//! ---
//!
//! ## Logging
//!
//! Events go through `tracing`. Callbacks log at `trace`, or `debug` when
//! [`MountOptions::debug`] is set. Installing a subscriber is up to the host.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Metadata`], [`DirEntry`], [`MountOptions`] and friends, plus [`MountOptions::from_json`] |

mod dispatch;
mod error;
mod executor;
mod handles;
mod layer;
mod ops;
mod options;
mod protocol;
mod read_only;
mod session;
mod traits;
mod types;

pub mod translate;

// Errors
pub use error::{DispatchError, FsError};

// Backend-side types
pub use types::{
    AccessMode, DirEntry, FileType, Handle, Metadata, OpenFlags, Permissions, StatFs,
};

// Backend contract
pub use traits::{
    FsDir, FsHandles, FsLink, FsMount, FsPermissions, FsRead, FsStats, FsSync, FsTimes, FsWrite,
    ReadDirIter,
};

// Kernel-facing structures and the callback surface
pub use ops::{FuseOperations, OpClass, OpKind};
pub use protocol::{DirFiller, FileInfo, FileStat, SetTime, StatVfs, Timespec};

// Mounting
pub use dispatch::Dispatcher;
pub use executor::DEFAULT_KEEP_ALIVE;
pub use handles::{HandleTable, OpenHandle, Resource};
pub use options::MountOptions;
pub use session::{mount, MountSession};

// Decoration
pub use layer::{Layer, LayerExt};
pub use read_only::{ReadOnlyLayer, ReadOnlyView};
