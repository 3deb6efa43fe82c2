//! # Handle Table
//!
//! Maps the tokens the bridge hands to the kernel (`fuse_file_info.fh`) onto
//! open backend resources.
//!
//! Tokens are allocated from a counter starting at 1 and are never reused
//! within a table, so a stale token can only ever miss. The table lock guards
//! bookkeeping only; backend calls run after it is released, which lets
//! `fgetattr` look up a handle from the concurrent context while a serialized
//! read is in progress on the same handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{FsError, FsHandles, FsRead, Handle, OpenFlags, Permissions};

/// What an open token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// An open backend file.
    File(Handle),
    /// An open directory. Listings are re-read from the backend on each call.
    Directory,
}

/// One live entry of the table.
#[derive(Debug)]
pub struct OpenHandle {
    path: PathBuf,
    flags: OpenFlags,
    resource: Resource,
}

impl OpenHandle {
    /// Path the handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flags the handle was opened with.
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Backend resource behind the token.
    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Returns `true` for directory handles.
    pub fn is_dir(&self) -> bool {
        self.resource == Resource::Directory
    }
}

/// Token-to-handle map shared by both execution contexts of a session.
#[derive(Debug)]
pub struct HandleTable {
    entries: Mutex<HashMap<u64, Arc<OpenHandle>>>,
    next_token: AtomicU64,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    /// Empty table. The first token issued is 1.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    fn insert(&self, path: &Path, flags: OpenFlags, resource: Resource) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(OpenHandle {
            path: path.to_path_buf(),
            flags,
            resource,
        });
        self.entries.lock().insert(token, handle);
        trace!(token, path = %path.display(), ?resource, "handle issued");
        token
    }

    /// Open a backend file and issue a token for it.
    ///
    /// # Errors
    ///
    /// Whatever the backend's [`FsHandles::open`] reports.
    pub fn open<B>(
        &self,
        backend: &B,
        path: &Path,
        flags: OpenFlags,
        perm: Permissions,
    ) -> Result<u64, FsError>
    where
        B: FsHandles + ?Sized,
    {
        let handle = backend.open(path, flags, perm)?;
        Ok(self.insert(path, flags, Resource::File(handle)))
    }

    /// Issue a token for a directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if it is not a directory
    pub fn open_dir<B>(&self, backend: &B, path: &Path) -> Result<u64, FsError>
    where
        B: FsRead + ?Sized,
    {
        if !backend.metadata(path)?.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        Ok(self.insert(path, OpenFlags::READ, Resource::Directory))
    }

    /// Look up a live token of either kind.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the token is unknown or released
    pub fn get(&self, token: u64) -> Result<Arc<OpenHandle>, FsError> {
        self.entries
            .lock()
            .get(&token)
            .cloned()
            .ok_or(FsError::InvalidHandle {
                handle: Handle(token),
            })
    }

    fn file(&self, token: u64) -> Result<Handle, FsError> {
        match self.get(token)?.resource {
            Resource::File(handle) => Ok(handle),
            Resource::Directory => Err(FsError::InvalidHandle {
                handle: Handle(token),
            }),
        }
    }

    /// Look up a live directory token.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the token is unknown or is a file
    pub fn dir(&self, token: u64) -> Result<Arc<OpenHandle>, FsError> {
        let handle = self.get(token)?;
        if handle.is_dir() {
            Ok(handle)
        } else {
            Err(FsError::InvalidHandle {
                handle: Handle(token),
            })
        }
    }

    /// Positional read through a file token. Short reads are returned as is.
    pub fn read<B>(
        &self,
        backend: &B,
        token: u64,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<usize, FsError>
    where
        B: FsHandles + ?Sized,
    {
        backend.read_at(self.file(token)?, buf, offset)
    }

    /// Positional write through a file token. Short writes are returned as is.
    pub fn write<B>(
        &self,
        backend: &B,
        token: u64,
        data: &[u8],
        offset: u64,
    ) -> Result<usize, FsError>
    where
        B: FsHandles + ?Sized,
    {
        backend.write_at(self.file(token)?, data, offset)
    }

    /// Resize through a file token.
    pub fn set_len<B>(&self, backend: &B, token: u64, size: u64) -> Result<(), FsError>
    where
        B: FsHandles + ?Sized,
    {
        backend.set_len(self.file(token)?, size)
    }

    /// Flush through a file token.
    pub fn flush<B>(&self, backend: &B, token: u64) -> Result<(), FsError>
    where
        B: FsHandles + ?Sized,
    {
        backend.flush(self.file(token)?)
    }

    /// Close the backend file and forget the token.
    ///
    /// The token is gone even if the backend close fails.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the token is unknown, already released,
    ///   or refers to a directory
    pub fn release<B>(&self, backend: &B, token: u64) -> Result<(), FsError>
    where
        B: FsHandles + ?Sized,
    {
        let handle = {
            let mut entries = self.entries.lock();
            match entries.get(&token).map(|open| open.resource) {
                Some(Resource::File(handle)) => {
                    entries.remove(&token);
                    handle
                }
                _ => {
                    return Err(FsError::InvalidHandle {
                        handle: Handle(token),
                    });
                }
            }
        };
        trace!(token, "handle released");
        backend.close(handle)
    }

    /// Forget a directory token.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the token is unknown, already released,
    ///   or refers to a file
    pub fn release_dir(&self, token: u64) -> Result<(), FsError> {
        let mut entries = self.entries.lock();
        match entries.get(&token) {
            Some(open) if open.is_dir() => {
                entries.remove(&token);
                Ok(())
            }
            _ => Err(FsError::InvalidHandle {
                handle: Handle(token),
            }),
        }
    }

    /// Number of live tokens.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no token is live.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Close everything still open. Returns how many tokens were leaked.
    pub fn drain<B>(&self, backend: &B) -> usize
    where
        B: FsHandles + ?Sized,
    {
        let leaked: Vec<_> = self.entries.lock().drain().collect();
        for (token, open) in &leaked {
            warn!(token, path = %open.path.display(), "handle still open at unmount");
            if let Resource::File(handle) = open.resource {
                if let Err(err) = backend.close(handle) {
                    warn!(token, %err, "closing leaked handle failed");
                }
            }
        }
        leaked.len()
    }
}
