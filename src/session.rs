//! # Mount Session
//!
//! [`MountSession`] is the object the protocol layer drives for one mount.
//! It owns the handle table and both execution contexts, shares the backend
//! with the work it submits, and answers every callback with a POSIX status.
//!
//! Each callback copies its inputs, runs the backend work on the context its
//! [`OpKind`] is classified into, waits, and then writes out-parameters on
//! the calling thread. Backend failures come back as `-errno`; a callback
//! whose work could not run or finish comes back as `-EIO`.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use tracing::{debug, error, info, trace, warn};

use crate::dispatch::Dispatcher;
use crate::handles::HandleTable;
use crate::layer::LayerExt;
use crate::ops::{FuseOperations, OpKind};
use crate::protocol::{DirFiller, FileInfo, FileStat, SetTime, StatVfs};
use crate::read_only::ReadOnlyLayer;
use crate::translate;
use crate::{DispatchError, FileType, FsError, FsMount, MountOptions, OpenFlags, Permissions};

/// `chown` id meaning "leave unchanged".
const UNCHANGED_ID: u32 = u32::MAX;

/// One mounted backend.
pub struct MountSession<B: FsMount + 'static> {
    backend: Arc<B>,
    handles: Arc<HandleTable>,
    dispatcher: Dispatcher,
    options: MountOptions,
    unmounted: AtomicBool,
}

impl<B: FsMount + 'static> MountSession<B> {
    /// Start a session over `backend`.
    ///
    /// The read-only flag in `options` is not applied here; use [`mount`] or
    /// wrap the session with [`ReadOnlyLayer`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::Spawn`] if the serial worker cannot be started.
    pub fn new(backend: Arc<B>, options: MountOptions) -> Result<Self, DispatchError> {
        let dispatcher = Dispatcher::new(&options.thread_name, options.keep_alive)?;
        info!(thread_name = %options.thread_name, "mount session started");
        Ok(Self {
            backend,
            handles: Arc::new(HandleTable::new()),
            dispatcher,
            options,
            unmounted: AtomicBool::new(false),
        })
    }

    /// The mounted backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Open file and directory tokens.
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Options the session was started with.
    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    /// Live threads in the concurrent context.
    pub fn concurrent_workers(&self) -> usize {
        self.dispatcher.concurrent_workers()
    }

    /// Tear the session down: finish queued callbacks, join every worker,
    /// close handles the kernel never released, and sync the backend.
    ///
    /// Later callbacks fail with `EIO`. Idempotent; also runs on drop.
    pub fn unmount(&self) {
        if self.unmounted.swap(true, Ordering::AcqRel) {
            return;
        }
        self.dispatcher.shutdown();
        let leaked = self.handles.drain(&*self.backend);
        if leaked > 0 {
            warn!(leaked, "closed handles left open at unmount");
        }
        if let Err(err) = self.backend.sync() {
            warn!(%err, "backend sync at unmount failed");
        }
        info!("mount session stopped");
    }

    fn run<T, F>(&self, kind: OpKind, path: &Path, work: F) -> Result<T, i32>
    where
        T: Send + 'static,
        F: FnOnce(&B, &HandleTable) -> Result<T, FsError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let handles = Arc::clone(&self.handles);
        match self.dispatcher.dispatch(kind, move || work(&*backend, &*handles)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                trace!(op = kind.name(), path = %path.display(), %err, "backend failure");
                Err(translate::status(Err(err)))
            }
            Err(err) => {
                error!(op = kind.name(), path = %path.display(), %err, "callback aborted");
                Err(-libc::EIO)
            }
        }
    }

    fn reply(&self, kind: OpKind, path: &Path, result: Result<i32, i32>) -> i32 {
        let status = result.unwrap_or_else(|errno| errno);
        if self.options.debug {
            debug!(op = kind.name(), path = %path.display(), status);
        } else {
            trace!(op = kind.name(), path = %path.display(), status);
        }
        status
    }

    fn unit<F>(&self, kind: OpKind, path: &Path, work: F) -> i32
    where
        F: FnOnce(&B, &HandleTable) -> Result<(), FsError> + Send + 'static,
    {
        let result = self.run(kind, path, work).map(|()| 0);
        self.reply(kind, path, result)
    }
}

impl<B: FsMount + 'static> Drop for MountSession<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn owner_id(id: u32) -> Option<u32> {
    (id != UNCHANGED_ID).then_some(id)
}

fn resolve_time(time: SetTime) -> Option<SystemTime> {
    match time {
        SetTime::Omit => None,
        SetTime::Now => Some(SystemTime::now()),
        SetTime::At(ts) => Some(translate::system_time_from_timespec(ts)),
    }
}

/// Copy a link target into a kernel buffer, NUL-terminated, truncating the
/// target if it does not fit.
fn copy_link_target(target: &[u8], buf: &mut [u8]) {
    let Some(room) = buf.len().checked_sub(1) else {
        return;
    };
    let n = target.len().min(room);
    buf[..n].copy_from_slice(&target[..n]);
    buf[n] = 0;
}

impl<B: FsMount + 'static> FuseOperations for MountSession<B> {
    fn getattr(&self, path: &Path, stat: &mut FileStat) -> i32 {
        let owned = path.to_path_buf();
        let result = self
            .run(OpKind::Getattr, path, move |fs, _| fs.symlink_metadata(&owned))
            .map(|meta| {
                *stat = translate::metadata_to_stat(&meta);
                0
            });
        self.reply(OpKind::Getattr, path, result)
    }

    fn readlink(&self, path: &Path, buf: &mut [u8]) -> i32 {
        let owned = path.to_path_buf();
        let result = self
            .run(OpKind::Readlink, path, move |fs, _| fs.read_link(&owned))
            .map(|target| {
                copy_link_target(&target.into_os_string().into_encoded_bytes(), buf);
                0
            });
        self.reply(OpKind::Readlink, path, result)
    }

    fn mknod(&self, path: &Path, mode: u32, _rdev: u64) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Mknod, path, move |fs, _| {
            let format = mode & libc::S_IFMT as u32;
            if format != 0 && translate::file_type_from_mode(mode) != Some(FileType::File) {
                return Err(FsError::NotSupported { operation: "mknod" });
            }
            let handle = fs.open(&owned, OpenFlags::CREATE_NEW, Permissions::from_mode(mode))?;
            fs.close(handle)
        })
    }

    fn mkdir(&self, path: &Path, mode: u32) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Mkdir, path, move |fs, _| {
            fs.create_dir(&owned, Permissions::from_mode(mode))
        })
    }

    fn unlink(&self, path: &Path) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Unlink, path, move |fs, _| fs.remove_file(&owned))
    }

    fn rmdir(&self, path: &Path) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Rmdir, path, move |fs, _| fs.remove_dir(&owned))
    }

    fn symlink(&self, target: &Path, link: &Path) -> i32 {
        let (target, owned) = (target.to_path_buf(), link.to_path_buf());
        self.unit(OpKind::Symlink, link, move |fs, _| fs.symlink(&target, &owned))
    }

    fn rename(&self, from: &Path, to: &Path) -> i32 {
        let (owned_from, owned_to) = (from.to_path_buf(), to.to_path_buf());
        self.unit(OpKind::Rename, from, move |fs, _| {
            fs.rename(&owned_from, &owned_to)
        })
    }

    fn link(&self, original: &Path, link: &Path) -> i32 {
        let (original, owned) = (original.to_path_buf(), link.to_path_buf());
        self.unit(OpKind::Link, link, move |fs, _| fs.hard_link(&original, &owned))
    }

    fn chmod(&self, path: &Path, mode: u32) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Chmod, path, move |fs, _| {
            fs.set_permissions(&owned, Permissions::from_mode(mode))
        })
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Chown, path, move |fs, _| {
            fs.set_owner(&owned, owner_id(uid), owner_id(gid))
        })
    }

    fn truncate(&self, path: &Path, size: u64) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Truncate, path, move |fs, _| fs.truncate(&owned, size))
    }

    fn open(&self, path: &Path, fi: &mut FileInfo) -> i32 {
        let owned = path.to_path_buf();
        let flags = translate::open_flags_from_posix(fi.flags);
        let result = self
            .run(OpKind::Open, path, move |fs, handles| {
                handles.open(fs, &owned, flags, Permissions::default_file())
            })
            .map(|token| {
                fi.fh = token;
                0
            });
        self.reply(OpKind::Open, path, result)
    }

    fn read(&self, path: &Path, buf: &mut [u8], offset: u64, fi: &FileInfo) -> i32 {
        let (token, len) = (fi.fh, buf.len());
        let result = self
            .run(OpKind::Read, path, move |fs, handles| {
                let mut chunk = vec![0u8; len];
                let n = handles.read(fs, token, &mut chunk, offset)?;
                chunk.truncate(n);
                Ok(chunk)
            })
            .map(|chunk| {
                buf[..chunk.len()].copy_from_slice(&chunk);
                translate::status(Ok(chunk.len()))
            });
        self.reply(OpKind::Read, path, result)
    }

    fn write(&self, path: &Path, data: &[u8], offset: u64, fi: &FileInfo) -> i32 {
        let (token, data) = (fi.fh, data.to_vec());
        let result = self
            .run(OpKind::Write, path, move |fs, handles| {
                handles.write(fs, token, &data, offset)
            })
            .map(|n| translate::status(Ok(n)));
        self.reply(OpKind::Write, path, result)
    }

    fn statfs(&self, path: &Path, stat: &mut StatVfs) -> i32 {
        let result = self
            .run(OpKind::Statfs, path, |fs, _| fs.statfs())
            .map(|stats| {
                *stat = translate::statfs_to_statvfs(&stats);
                0
            });
        self.reply(OpKind::Statfs, path, result)
    }

    fn flush(&self, path: &Path, fi: &FileInfo) -> i32 {
        let token = fi.fh;
        self.unit(OpKind::Flush, path, move |fs, handles| handles.flush(fs, token))
    }

    fn release(&self, path: &Path, fi: &FileInfo) -> i32 {
        let token = fi.fh;
        self.unit(OpKind::Release, path, move |fs, handles| {
            handles.release(fs, token)
        })
    }

    fn fsync(&self, path: &Path, _datasync: bool, fi: &FileInfo) -> i32 {
        let token = fi.fh;
        self.unit(OpKind::Fsync, path, move |fs, handles| {
            let open = handles.get(token)?;
            if open.is_dir() {
                return Err(FsError::InvalidHandle {
                    handle: crate::Handle(token),
                });
            }
            fs.fsync(open.path())
        })
    }

    fn opendir(&self, path: &Path, fi: &mut FileInfo) -> i32 {
        let owned = path.to_path_buf();
        let result = self
            .run(OpKind::Opendir, path, move |fs, handles| {
                handles.open_dir(fs, &owned)
            })
            .map(|token| {
                fi.fh = token;
                0
            });
        self.reply(OpKind::Opendir, path, result)
    }

    fn readdir(&self, path: &Path, fi: &FileInfo, filler: &mut dyn DirFiller) -> i32 {
        let (owned, token) = (path.to_path_buf(), fi.fh);
        let result = self
            .run(OpKind::Readdir, path, move |fs, handles| {
                handles.dir(token)?;
                fs.read_dir(&owned)?.collect_all()
            })
            .map(|entries| {
                translate::fill_directory(&entries, filler);
                0
            });
        self.reply(OpKind::Readdir, path, result)
    }

    fn releasedir(&self, path: &Path, fi: &FileInfo) -> i32 {
        let token = fi.fh;
        self.unit(OpKind::Releasedir, path, move |_, handles| {
            handles.release_dir(token)
        })
    }

    fn fsyncdir(&self, path: &Path, _datasync: bool, fi: &FileInfo) -> i32 {
        let token = fi.fh;
        self.unit(OpKind::Fsyncdir, path, move |fs, handles| {
            let open = handles.dir(token)?;
            fs.fsync(open.path())
        })
    }

    fn access(&self, path: &Path, mask: i32) -> i32 {
        let owned = path.to_path_buf();
        let mode = translate::access_mode_from_mask(mask);
        self.unit(OpKind::Access, path, move |fs, _| fs.check_access(&owned, mode))
    }

    fn create(&self, path: &Path, mode: u32, fi: &mut FileInfo) -> i32 {
        let owned = path.to_path_buf();
        let flags = OpenFlags {
            create: true,
            ..translate::open_flags_from_posix(fi.flags)
        };
        let result = self
            .run(OpKind::Create, path, move |fs, handles| {
                handles.open(fs, &owned, flags, Permissions::from_mode(mode))
            })
            .map(|token| {
                fi.fh = token;
                0
            });
        self.reply(OpKind::Create, path, result)
    }

    fn ftruncate(&self, path: &Path, size: u64, fi: &FileInfo) -> i32 {
        let token = fi.fh;
        self.unit(OpKind::Ftruncate, path, move |fs, handles| {
            handles.set_len(fs, token, size)
        })
    }

    fn fgetattr(&self, path: &Path, stat: &mut FileStat, fi: &FileInfo) -> i32 {
        let token = fi.fh;
        let result = self
            .run(OpKind::Fgetattr, path, move |fs, handles| {
                let open = handles.get(token)?;
                fs.metadata(open.path())
            })
            .map(|meta| {
                *stat = translate::metadata_to_stat(&meta);
                0
            });
        self.reply(OpKind::Fgetattr, path, result)
    }

    fn utimens(&self, path: &Path, atime: SetTime, mtime: SetTime) -> i32 {
        let owned = path.to_path_buf();
        self.unit(OpKind::Utimens, path, move |fs, _| {
            fs.set_times(&owned, resolve_time(atime), resolve_time(mtime))
        })
    }
}

/// Mount `backend` and return the callback surface the protocol layer
/// drives, wrapped in a [`ReadOnlyView`](crate::ReadOnlyView) when
/// `options.read_only` is set.
///
/// Dropping the returned value unmounts.
///
/// # Errors
///
/// [`DispatchError::Spawn`] if the serial worker cannot be started.
///
/// # Example
///
/// ```rust,ignore
/// let ops = anyfs_mount::mount(Arc::new(backend), MountOptions::default().with_read_only(true))?;
/// let mut stat = FileStat::default();
/// assert_eq!(ops.getattr(Path::new("/"), &mut stat), 0);
/// ```
pub fn mount<B>(
    backend: Arc<B>,
    options: MountOptions,
) -> Result<Box<dyn FuseOperations>, DispatchError>
where
    B: FsMount + 'static,
{
    let read_only = options.read_only;
    let session = MountSession::new(backend, options)?;
    if read_only {
        Ok(Box::new(session.layer(ReadOnlyLayer)))
    } else {
        Ok(Box::new(session))
    }
}
