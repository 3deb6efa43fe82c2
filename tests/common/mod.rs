//! Shared fixtures for the integration tests.
//!
//! [`MemoryFs`] is a complete in-memory backend. Besides the tree it keeps a
//! log of every backend call, tracks how many non-query calls overlap, and
//! can be told to stall or panic inside a chosen call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::SystemTime;

use anyfs_mount::{
    AccessMode, DirEntry, FileType, FsDir, FsError, FsHandles, FsLink, FsPermissions, FsRead,
    FsStats, FsSync, FsTimes, FsWrite, Handle, Metadata, OpenFlags, Permissions, ReadDirIter,
    StatFs,
};
use crossbeam_channel::{Receiver, Sender};

/// Install a test-friendly subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Backend calls that change the tree, attributes or contents.
pub const MUTATING_CALLS: &[&str] = &[
    "remove_file",
    "rename",
    "truncate",
    "create_dir",
    "remove_dir",
    "symlink",
    "hard_link",
    "set_permissions",
    "set_owner",
    "set_times",
    "write_at",
    "set_len",
    "open(mutating)",
];

/// Backend calls the concurrent context makes.
const QUERY_CALLS: &[&str] = &["metadata", "symlink_metadata", "check_access"];

struct Inode {
    kind: FileType,
    data: Vec<u8>,
    target: PathBuf,
    perm: Permissions,
    uid: u32,
    gid: u32,
    nlink: u64,
    accessed: SystemTime,
    modified: SystemTime,
    changed: SystemTime,
}

impl Inode {
    fn new(kind: FileType, perm: Permissions) -> Self {
        let now = SystemTime::now();
        Self {
            kind,
            data: Vec::new(),
            target: PathBuf::new(),
            perm,
            uid: 1000,
            gid: 1000,
            nlink: 1,
            accessed: now,
            modified: now,
            changed: now,
        }
    }
}

#[derive(Default)]
struct Tree {
    paths: HashMap<PathBuf, u64>,
    inodes: HashMap<u64, Inode>,
}

struct OpenFile {
    inode: u64,
    flags: OpenFlags,
}

struct Stall {
    op: &'static str,
    entered: Sender<()>,
    release: Receiver<()>,
}

/// In-memory backend with instrumentation.
pub struct MemoryFs {
    tree: Mutex<Tree>,
    handles: Mutex<HashMap<u64, OpenFile>>,
    next_inode: AtomicU64,
    next_handle: AtomicU64,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    stall: Mutex<Option<Stall>>,
    fault: Mutex<Option<&'static str>>,
    unreadable: Mutex<HashSet<PathBuf>>,
}

/// Decrements the overlap counter when a non-query call returns.
struct Active<'a>(Option<&'a AtomicUsize>);

impl Drop for Active<'_> {
    fn drop(&mut self) {
        if let Some(active) = self.0 {
            active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn not_found(path: &Path) -> FsError {
    FsError::NotFound {
        path: path.to_path_buf(),
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Empty tree with only `/`.
    pub fn new() -> Self {
        let fs = Self {
            tree: Mutex::new(Tree::default()),
            handles: Mutex::new(HashMap::new()),
            next_inode: AtomicU64::new(1),
            next_handle: AtomicU64::new(1000),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            stall: Mutex::new(None),
            fault: Mutex::new(None),
            unreadable: Mutex::new(HashSet::new()),
        };
        fs.insert(Path::new("/"), Inode::new(FileType::Directory, Permissions::default_dir()));
        fs
    }

    fn insert(&self, path: &Path, inode: Inode) -> u64 {
        let id = self.next_inode.fetch_add(1, Ordering::SeqCst);
        let mut tree = self.tree.lock().unwrap();
        tree.inodes.insert(id, inode);
        tree.paths.insert(path.to_path_buf(), id);
        id
    }

    /// Seed a file without going through the call log.
    pub fn add_file(&self, path: &str, data: &[u8]) {
        let mut inode = Inode::new(FileType::File, Permissions::default_file());
        inode.data = data.to_vec();
        self.insert(Path::new(path), inode);
    }

    /// Seed a directory without going through the call log.
    pub fn add_dir(&self, path: &str) {
        self.insert(
            Path::new(path),
            Inode::new(FileType::Directory, Permissions::default_dir()),
        );
    }

    /// Seed a symlink without going through the call log.
    pub fn add_symlink(&self, path: &str, target: &str) {
        let mut inode = Inode::new(FileType::Symlink, Permissions::from_mode(0o777));
        inode.target = PathBuf::from(target);
        self.insert(Path::new(path), inode);
    }

    /// Seed a file with explicit permission bits.
    pub fn add_file_with_mode(&self, path: &str, mode: u32) {
        self.insert(
            Path::new(path),
            Inode::new(FileType::File, Permissions::from_mode(mode)),
        );
    }

    /// Contents of a file, if it exists.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let tree = self.tree.lock().unwrap();
        let id = tree.paths.get(Path::new(path))?;
        Some(tree.inodes[id].data.clone())
    }

    /// Returns `true` if the path exists.
    pub fn exists(&self, path: &str) -> bool {
        self.tree.lock().unwrap().paths.contains_key(Path::new(path))
    }

    /// Every backend call so far, in call order, as `name` or `name path`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose name is one of [`MUTATING_CALLS`].
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| {
                let name = call.split(' ').next().unwrap_or_default();
                MUTATING_CALLS.contains(&name)
            })
            .collect()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Highest number of non-query calls that were ever running at once.
    pub fn max_overlap(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Backend handles not yet closed.
    pub fn open_handles(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Block the next `op` call until the returned sender fires or drops.
    /// The receiver fires once the call has started.
    pub fn stall_next(&self, op: &'static str) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded(0);
        *self.stall.lock().unwrap() = Some(Stall {
            op,
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }

    /// Panic inside the next `op` call.
    pub fn fail_next(&self, op: &'static str) {
        *self.fault.lock().unwrap() = Some(op);
    }

    /// Listings of the parent yield an `Err` in place of this entry.
    pub fn fail_entry(&self, path: &str) {
        self.unreadable.lock().unwrap().insert(PathBuf::from(path));
    }

    fn enter(&self, op: &'static str, path: Option<&Path>) -> Active<'_> {
        let entry = match path {
            Some(path) => format!("{op} {}", path.display()),
            None => op.to_owned(),
        };
        self.calls.lock().unwrap().push(entry);

        let active = if QUERY_CALLS.contains(&op) {
            Active(None)
        } else {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            Active(Some(&self.active))
        };

        let stall = {
            let mut slot = self.stall.lock().unwrap();
            match slot.as_ref() {
                Some(stall) if stall.op == op => slot.take(),
                _ => None,
            }
        };
        if let Some(stall) = stall {
            let _ = stall.entered.send(());
            let _ = stall.release.recv();
        }

        let fault = {
            let mut slot = self.fault.lock().unwrap();
            if *slot == Some(op) { slot.take() } else { None }
        };
        if fault.is_some() {
            panic!("injected fault in {op}");
        }
        active
    }

    fn lookup(tree: &Tree, path: &Path) -> Result<u64, FsError> {
        tree.paths.get(path).copied().ok_or_else(|| not_found(path))
    }

    fn require_parent_dir(tree: &Tree, path: &Path) -> Result<(), FsError> {
        let parent = path.parent().ok_or_else(|| not_found(path))?;
        let id = Self::lookup(tree, parent)?;
        if tree.inodes[&id].kind != FileType::Directory {
            return Err(FsError::NotADirectory {
                path: parent.to_path_buf(),
            });
        }
        Ok(())
    }

    fn require_absent(tree: &Tree, path: &Path, operation: &'static str) -> Result<(), FsError> {
        if tree.paths.contains_key(path) {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                operation,
            });
        }
        Ok(())
    }

    fn has_children(tree: &Tree, path: &Path) -> bool {
        tree.paths.keys().any(|p| p.parent() == Some(path))
    }

    fn unlink_id(tree: &mut Tree, path: &Path) -> Option<u64> {
        let id = tree.paths.remove(path)?;
        if let Some(inode) = tree.inodes.get_mut(&id) {
            inode.nlink = inode.nlink.saturating_sub(1);
            inode.changed = SystemTime::now();
        }
        Some(id)
    }

    fn stat(tree: &Tree, id: u64) -> Metadata {
        let inode = &tree.inodes[&id];
        let size = match inode.kind {
            FileType::Symlink => inode.target.as_os_str().len() as u64,
            _ => inode.data.len() as u64,
        };
        Metadata {
            file_type: inode.kind,
            size,
            permissions: inode.perm,
            uid: inode.uid,
            gid: inode.gid,
            created: inode.changed,
            modified: inode.modified,
            accessed: inode.accessed,
            changed: inode.changed,
            inode: id,
            nlink: inode.nlink,
        }
    }

    fn open_file(&self, handle: Handle) -> Result<(u64, OpenFlags), FsError> {
        self.handles
            .lock()
            .unwrap()
            .get(&handle.0)
            .map(|open| (open.inode, open.flags))
            .ok_or(FsError::InvalidHandle { handle })
    }

    fn update<F>(&self, path: &Path, f: F) -> Result<(), FsError>
    where
        F: FnOnce(&mut Inode),
    {
        let mut tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        let inode = tree.inodes.get_mut(&id).ok_or_else(|| not_found(path))?;
        f(inode);
        inode.changed = SystemTime::now();
        Ok(())
    }
}

impl FsRead for MemoryFs {
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let _active = self.enter("metadata", Some(path));
        let tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        let inode = &tree.inodes[&id];
        if inode.kind == FileType::Symlink {
            let target = Self::lookup(&tree, &inode.target)?;
            return Ok(Self::stat(&tree, target));
        }
        Ok(Self::stat(&tree, id))
    }

    fn check_access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        let _active = self.enter("check_access", Some(path));
        let tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        let bits = tree.inodes[&id].perm.mode();
        let denied = (mode.read && bits & 0o400 == 0)
            || (mode.write && bits & 0o200 == 0)
            || (mode.execute && bits & 0o100 == 0);
        if denied {
            return Err(FsError::PermissionDenied {
                path: path.to_path_buf(),
                operation: "access",
            });
        }
        Ok(())
    }
}

impl FsWrite for MemoryFs {
    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let _active = self.enter("remove_file", Some(path));
        let mut tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        if tree.inodes[&id].kind == FileType::Directory {
            return Err(FsError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Self::unlink_id(&mut tree, path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let _active = self.enter("rename", Some(from));
        let mut tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, from)?;
        Self::require_parent_dir(&tree, to)?;
        if let Some(&existing) = tree.paths.get(to) {
            if tree.inodes[&existing].kind == FileType::Directory && Self::has_children(&tree, to) {
                return Err(FsError::DirectoryNotEmpty {
                    path: to.to_path_buf(),
                });
            }
            Self::unlink_id(&mut tree, to);
        }

        let moved: Vec<_> = tree
            .paths
            .keys()
            .filter(|p| p.starts_with(from) && p.as_path() != from)
            .cloned()
            .collect();
        for old in moved {
            if let Ok(rest) = old.strip_prefix(from) {
                let new = to.join(rest);
                if let Some(child) = tree.paths.remove(&old) {
                    tree.paths.insert(new, child);
                }
            }
        }
        tree.paths.remove(from);
        tree.paths.insert(to.to_path_buf(), id);
        Ok(())
    }

    fn truncate(&self, path: &Path, size: u64) -> Result<(), FsError> {
        let _active = self.enter("truncate", Some(path));
        let mut tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        let inode = tree.inodes.get_mut(&id).ok_or_else(|| not_found(path))?;
        if inode.kind == FileType::Directory {
            return Err(FsError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        inode.data.resize(size as usize, 0);
        inode.modified = SystemTime::now();
        Ok(())
    }
}

impl FsDir for MemoryFs {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let _active = self.enter("read_dir", Some(path));
        let tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        if tree.inodes[&id].kind != FileType::Directory {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let mut entries: Vec<_> = tree
            .paths
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, &child)| {
                let inode = &tree.inodes[&child];
                DirEntry {
                    name: p
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    path: p.clone(),
                    file_type: inode.kind,
                    size: inode.data.len() as u64,
                    inode: child,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let unreadable = self.unreadable.lock().unwrap();
        let entries = entries
            .into_iter()
            .map(|entry| {
                if unreadable.contains(&entry.path) {
                    Err(FsError::PermissionDenied {
                        path: entry.path,
                        operation: "read_dir",
                    })
                } else {
                    Ok(entry)
                }
            })
            .collect();
        Ok(ReadDirIter::from_vec(entries))
    }

    fn create_dir(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let _active = self.enter("create_dir", Some(path));
        {
            let tree = self.tree.lock().unwrap();
            Self::require_absent(&tree, path, "create_dir")?;
            Self::require_parent_dir(&tree, path)?;
        }
        self.insert(path, Inode::new(FileType::Directory, perm));
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        let _active = self.enter("remove_dir", Some(path));
        let mut tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        if tree.inodes[&id].kind != FileType::Directory {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        if Self::has_children(&tree, path) {
            return Err(FsError::DirectoryNotEmpty {
                path: path.to_path_buf(),
            });
        }
        tree.paths.remove(path);
        tree.inodes.remove(&id);
        Ok(())
    }
}

impl FsLink for MemoryFs {
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError> {
        let _active = self.enter("symlink", Some(link));
        {
            let tree = self.tree.lock().unwrap();
            Self::require_absent(&tree, link, "symlink")?;
            Self::require_parent_dir(&tree, link)?;
        }
        let mut inode = Inode::new(FileType::Symlink, Permissions::from_mode(0o777));
        inode.target = target.to_path_buf();
        self.insert(link, inode);
        Ok(())
    }

    fn hard_link(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        let _active = self.enter("hard_link", Some(link));
        let mut tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, original)?;
        if tree.inodes[&id].kind == FileType::Directory {
            return Err(FsError::NotAFile {
                path: original.to_path_buf(),
            });
        }
        Self::require_absent(&tree, link, "hard_link")?;
        Self::require_parent_dir(&tree, link)?;
        tree.paths.insert(link.to_path_buf(), id);
        if let Some(inode) = tree.inodes.get_mut(&id) {
            inode.nlink += 1;
        }
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        let _active = self.enter("read_link", Some(path));
        let tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        let inode = &tree.inodes[&id];
        if inode.kind != FileType::Symlink {
            return Err(FsError::InvalidData {
                path: path.to_path_buf(),
                details: "not a symlink".into(),
            });
        }
        Ok(inode.target.clone())
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let _active = self.enter("symlink_metadata", Some(path));
        let tree = self.tree.lock().unwrap();
        let id = Self::lookup(&tree, path)?;
        Ok(Self::stat(&tree, id))
    }
}

impl FsPermissions for MemoryFs {
    fn set_permissions(&self, path: &Path, perm: Permissions) -> Result<(), FsError> {
        let _active = self.enter("set_permissions", Some(path));
        self.update(path, |inode| inode.perm = perm)
    }

    fn set_owner(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        let _active = self.enter("set_owner", Some(path));
        self.update(path, |inode| {
            if let Some(uid) = uid {
                inode.uid = uid;
            }
            if let Some(gid) = gid {
                inode.gid = gid;
            }
        })
    }
}

impl FsTimes for MemoryFs {
    fn set_times(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<(), FsError> {
        let _active = self.enter("set_times", Some(path));
        self.update(path, |inode| {
            if let Some(accessed) = accessed {
                inode.accessed = accessed;
            }
            if let Some(modified) = modified {
                inode.modified = modified;
            }
        })
    }
}

impl FsStats for MemoryFs {
    fn statfs(&self) -> Result<StatFs, FsError> {
        let _active = self.enter("statfs", None);
        let tree = self.tree.lock().unwrap();
        let used: u64 = tree.inodes.values().map(|i| i.data.len() as u64).sum();
        Ok(StatFs {
            total_bytes: 100 * 1024 * 1024,
            used_bytes: used,
            available_bytes: 100 * 1024 * 1024 - used,
            total_inodes: 10_000,
            used_inodes: tree.inodes.len() as u64,
            available_inodes: 10_000 - tree.inodes.len() as u64,
            block_size: 4096,
            max_name_len: 255,
        })
    }
}

impl FsSync for MemoryFs {
    fn sync(&self) -> Result<(), FsError> {
        let _active = self.enter("sync", None);
        Ok(())
    }

    fn fsync(&self, path: &Path) -> Result<(), FsError> {
        let _active = self.enter("fsync", Some(path));
        Self::lookup(&self.tree.lock().unwrap(), path).map(|_| ())
    }
}

impl FsHandles for MemoryFs {
    fn open(&self, path: &Path, flags: OpenFlags, perm: Permissions) -> Result<Handle, FsError> {
        let op = if flags.mutates() { "open(mutating)" } else { "open" };
        let _active = self.enter(op, Some(path));

        let existing = self.tree.lock().unwrap().paths.get(path).copied();
        let inode = match existing {
            Some(_) if flags.create && flags.exclusive => {
                return Err(FsError::AlreadyExists {
                    path: path.to_path_buf(),
                    operation: "open",
                });
            }
            Some(id) => {
                let mut tree = self.tree.lock().unwrap();
                let inode = tree.inodes.get_mut(&id).ok_or_else(|| not_found(path))?;
                if inode.kind == FileType::Directory {
                    return Err(FsError::NotAFile {
                        path: path.to_path_buf(),
                    });
                }
                if flags.truncate && flags.write {
                    inode.data.clear();
                    inode.modified = SystemTime::now();
                }
                id
            }
            None if !flags.create => return Err(not_found(path)),
            None => {
                Self::require_parent_dir(&self.tree.lock().unwrap(), path)?;
                self.insert(path, Inode::new(FileType::File, perm))
            }
        };

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.handles
            .lock()
            .unwrap()
            .insert(id, OpenFile { inode, flags });
        Ok(Handle(id))
    }

    fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        let _active = self.enter("read_at", None);
        let (id, flags) = self.open_file(handle)?;
        if !flags.read {
            return Err(FsError::PermissionDenied {
                path: PathBuf::new(),
                operation: "read",
            });
        }
        let tree = self.tree.lock().unwrap();
        let data = tree.inodes.get(&id).map(|i| i.data.as_slice()).unwrap_or_default();
        let start = offset as usize;
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let _active = self.enter("write_at", None);
        let (id, flags) = self.open_file(handle)?;
        if !flags.write {
            return Err(FsError::PermissionDenied {
                path: PathBuf::new(),
                operation: "write",
            });
        }
        let mut tree = self.tree.lock().unwrap();
        let inode = tree.inodes.get_mut(&id).ok_or(FsError::InvalidHandle { handle })?;
        let start = if flags.append {
            inode.data.len()
        } else {
            offset as usize
        };
        let end = start + data.len();
        if end > inode.data.len() {
            inode.data.resize(end, 0);
        }
        inode.data[start..end].copy_from_slice(data);
        inode.modified = SystemTime::now();
        Ok(data.len())
    }

    fn set_len(&self, handle: Handle, size: u64) -> Result<(), FsError> {
        let _active = self.enter("set_len", None);
        let (id, _) = self.open_file(handle)?;
        let mut tree = self.tree.lock().unwrap();
        let inode = tree.inodes.get_mut(&id).ok_or(FsError::InvalidHandle { handle })?;
        inode.data.resize(size as usize, 0);
        inode.modified = SystemTime::now();
        Ok(())
    }

    fn flush(&self, handle: Handle) -> Result<(), FsError> {
        let _active = self.enter("flush", None);
        self.open_file(handle).map(|_| ())
    }

    fn close(&self, handle: Handle) -> Result<(), FsError> {
        let _active = self.enter("close", None);
        self.handles
            .lock()
            .unwrap()
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(FsError::InvalidHandle { handle })
    }
}
