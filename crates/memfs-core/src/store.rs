// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The file store: a flat, name-keyed table of in-memory files
//!
//! Every operation takes the path handed over by the kernel interface
//! (`/name`). The root directory is implicit; everything after the leading
//! `/` is the file name. All state, including the open-file counter, sits
//! behind a single mutex so that keyspace changes and buffer updates are
//! observed consistently.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{FsConfig, FsLimits};
use crate::error::{FsError, FsResult};
use crate::{Attributes, FileKind, FileTimes, FsStats, Owner};

/// Permission bits reported for the root directory
const ROOT_PERMISSIONS: u32 = 0o755;

/// Bits of a mode that are kept as file permissions
const PERMISSION_MASK: u32 = 0o7777;

/// One file's metadata and content
#[derive(Clone, Debug)]
pub(crate) struct FileRecord {
    pub(crate) name: String,
    pub(crate) permissions: u32,
    pub(crate) owner: Owner,
    /// Content; its length is the file size.
    pub(crate) data: Vec<u8>,
    pub(crate) times: FileTimes,
}

impl FileRecord {
    fn new(name: &str, permissions: u32, owner: Owner, now: i64) -> Self {
        Self {
            name: name.to_owned(),
            permissions,
            owner,
            data: Vec::new(),
            times: FileTimes::all(now),
        }
    }

    pub(crate) fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Resize the content to exactly `len` bytes. New bytes are zero.
    fn resize(&mut self, len: usize) -> FsResult<()> {
        let current = self.data.len();
        if len > current {
            self.data
                .try_reserve_exact(len - current)
                .map_err(|_| FsError::NoSpace)?;
            self.data.resize(len, 0);
        } else {
            self.data.truncate(len);
            self.data.shrink_to_fit();
        }
        Ok(())
    }

    fn touch_modified(&mut self, now: i64) {
        self.times.mtime = now;
        self.times.ctime = now;
    }

    fn attributes(&self) -> Attributes {
        Attributes {
            kind: FileKind::RegularFile,
            perm: self.permissions,
            nlink: 1,
            len: self.size(),
            uid: self.owner.uid,
            gid: self.owner.gid,
            times: self.times,
        }
    }
}

/// Bounded count of open files, shared by all files in the store
#[derive(Clone, Copy, Debug)]
pub(crate) struct OpenFileCounter {
    value: usize,
    limit: usize,
}

impl OpenFileCounter {
    fn new(limit: usize) -> Self {
        Self { value: 0, limit }
    }

    fn acquire(&mut self) -> FsResult<()> {
        if self.value >= self.limit {
            return Err(FsError::TooManyOpenFiles);
        }
        self.value += 1;
        Ok(())
    }

    fn release(&mut self) -> FsResult<()> {
        self.value = self.value.checked_sub(1).ok_or(FsError::InvalidState)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.value = 0;
    }

    pub(crate) fn value(&self) -> usize {
        self.value
    }
}

#[derive(Debug)]
struct StoreState {
    files: HashMap<String, FileRecord>,
    open_files: OpenFileCounter,
}

/// What a path names in the flat namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target<'a> {
    Root,
    File(&'a str),
}

fn resolve(path: &Path) -> FsResult<Target<'_>> {
    let raw = path.to_str().ok_or(FsError::InvalidArgument)?;
    let name = raw.strip_prefix('/').ok_or(FsError::InvalidArgument)?;
    if name.is_empty() {
        Ok(Target::Root)
    } else {
        Ok(Target::File(name))
    }
}

fn is_dot_entry(name: &str) -> bool {
    name == "." || name == ".."
}

/// Name of an existing-file path. The root is not a file.
fn file_name(path: &Path) -> FsResult<&str> {
    match resolve(path)? {
        Target::Root => Err(FsError::NotFound),
        Target::File(name) => Ok(name),
    }
}

/// In-memory file table
pub struct FileStore {
    limits: FsLimits,
    owner: Owner,
    clock: Box<dyn Clock>,
    mounted_at: i64,
    state: Mutex<StoreState>,
}

impl FileStore {
    /// Create an empty store using wall-clock time
    pub fn new(config: &FsConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: &FsConfig, clock: Box<dyn Clock>) -> Self {
        let mounted_at = clock.now();
        Self {
            limits: config.limits.clone(),
            owner: config.owner(),
            clock,
            mounted_at,
            state: Mutex::new(StoreState {
                files: HashMap::new(),
                open_files: OpenFileCounter::new(config.limits.max_open_files),
            }),
        }
    }

    pub fn limits(&self) -> &FsLimits {
        &self.limits
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Operations validate before mutating, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate a name that is about to be inserted into the table
    fn check_new_name(&self, name: &str) -> FsResult<()> {
        if name.contains('/') {
            // Only the root directory exists
            return Err(FsError::NotFound);
        }
        if name.len() > self.limits.name_length {
            warn!(name, limit = self.limits.name_length, "file name too long");
            return Err(FsError::NameTooLong);
        }
        Ok(())
    }

    /// Mount hook: no file is open on a fresh mount.
    pub fn init(&self) {
        let mut state = self.lock();
        state.open_files.reset();
        info!(files = state.files.len(), "file store initialized");
    }

    /// Create an empty regular file
    pub fn create(&self, path: impl AsRef<Path>, mode: u32) -> FsResult<()> {
        let name = match resolve(path.as_ref())? {
            Target::Root => return Err(FsError::AlreadyExists),
            Target::File(name) if is_dot_entry(name) => return Err(FsError::AlreadyExists),
            Target::File(name) => name,
        };
        self.check_new_name(name)?;

        let mut state = self.lock();
        if state.files.contains_key(name) {
            debug!(name, "create: file already exists");
            return Err(FsError::AlreadyExists);
        }
        if state.files.len() >= self.limits.max_dir_entries {
            warn!(
                limit = self.limits.max_dir_entries,
                "create: directory is full"
            );
            return Err(FsError::NoSpace);
        }

        let permissions = mode & PERMISSION_MASK;
        let record = FileRecord::new(name, permissions, self.owner, self.clock.now());
        state.files.insert(name.to_owned(), record);
        debug!(name, mode = format_args!("{:o}", permissions), "created file");
        Ok(())
    }

    /// Remove a file and release its content
    pub fn delete(&self, path: impl AsRef<Path>) -> FsResult<()> {
        let name = file_name(path.as_ref())?;
        let mut state = self.lock();
        let record = state.files.remove(name).ok_or(FsError::NotFound)?;
        debug!(name, bytes = record.size(), "deleted file");
        Ok(())
    }

    /// Delete every file one at a time. Returns the number of files removed.
    pub fn delete_all(&self) -> usize {
        let names: Vec<String> = self.lock().files.keys().cloned().collect();
        info!(files = names.len(), "deleting all files");

        let mut removed = 0;
        for name in names {
            match self.delete(format!("/{name}")) {
                Ok(()) => removed += 1,
                Err(err) => warn!(name = %name, error = %err, "failed to delete file"),
            }
        }
        removed
    }

    /// Move a file to a new name, replacing any file already there.
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> FsResult<()> {
        let from_name = file_name(from.as_ref())?;
        let mut state = self.lock();
        if !state.files.contains_key(from_name) {
            debug!(from = from_name, "rename: source does not exist");
            return Err(FsError::NotFound);
        }

        let to_name = match resolve(to.as_ref())? {
            Target::Root => return Err(FsError::InvalidArgument),
            Target::File(name) if is_dot_entry(name) => return Err(FsError::InvalidArgument),
            Target::File(name) => name,
        };
        self.check_new_name(to_name)?;
        if from_name == to_name {
            return Ok(());
        }

        if let Some(replaced) = state.files.remove(to_name) {
            debug!(name = to_name, bytes = replaced.size(), "rename: replacing existing file");
        }
        let mut record = state.files.remove(from_name).ok_or(FsError::NotFound)?;
        record.name = to_name.to_owned();
        record.times.ctime = self.clock.now();
        state.files.insert(to_name.to_owned(), record);

        debug!(from = from_name, to = to_name, "renamed file");
        Ok(())
    }

    /// Attributes of the root directory or of a file
    pub fn stat(&self, path: impl AsRef<Path>) -> FsResult<Attributes> {
        match resolve(path.as_ref())? {
            Target::Root => Ok(Attributes {
                kind: FileKind::Directory,
                perm: ROOT_PERMISSIONS,
                nlink: 2,
                len: 0,
                uid: self.owner.uid,
                gid: self.owner.gid,
                times: FileTimes::all(self.mounted_at),
            }),
            Target::File(name) => {
                let state = self.lock();
                state.files.get(name).map(FileRecord::attributes).ok_or(FsError::NotFound)
            }
        }
    }

    /// Replace the permission bits of a file
    pub fn chmod(&self, path: impl AsRef<Path>, mode: u32) -> FsResult<()> {
        let name = file_name(path.as_ref())?;
        let now = self.clock.now();
        let mut state = self.lock();
        let record = state.files.get_mut(name).ok_or(FsError::NotFound)?;
        record.permissions = mode & PERMISSION_MASK;
        record.times.ctime = now;
        debug!(name, mode = format_args!("{:o}", record.permissions), "changed permissions");
        Ok(())
    }

    /// Change owner and/or group. `None` leaves that id unchanged.
    pub fn chown(
        &self,
        path: impl AsRef<Path>,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> FsResult<()> {
        let name = file_name(path.as_ref())?;
        let mut state = self.lock();
        let record = state.files.get_mut(name).ok_or(FsError::NotFound)?;
        if let Some(uid) = uid {
            record.owner.uid = uid;
        }
        if let Some(gid) = gid {
            record.owner.gid = gid;
        }
        debug!(name, ?uid, ?gid, "changed owner");
        Ok(())
    }

    /// Admit one more open file
    pub fn open(&self, path: impl AsRef<Path>) -> FsResult<()> {
        let name = file_name(path.as_ref())?;
        let mut state = self.lock();
        if !state.files.contains_key(name) {
            return Err(FsError::NotFound);
        }
        if let Err(err) = state.open_files.acquire() {
            warn!(name, limit = self.limits.max_open_files, "too many open files");
            return Err(err);
        }
        debug!(name, open_files = state.open_files.value(), "opened file");
        Ok(())
    }

    pub fn close(&self, path: impl AsRef<Path>) -> FsResult<()> {
        let name = file_name(path.as_ref())?;
        let mut state = self.lock();
        if !state.files.contains_key(name) {
            return Err(FsError::NotFound);
        }
        if let Err(err) = state.open_files.release() {
            warn!(name, "close without a matching open");
            return Err(err);
        }
        debug!(name, open_files = state.open_files.value(), "closed file");
        Ok(())
    }

    /// Copy up to `buf.len()` bytes starting at `offset` into `buf`.
    /// Returns the number of bytes copied, 0 at or past end of file.
    pub fn read(&self, path: impl AsRef<Path>, offset: u64, buf: &mut [u8]) -> FsResult<usize> {
        let name = file_name(path.as_ref())?;
        let now = self.clock.now();
        let mut state = self.lock();
        let record = state.files.get_mut(name).ok_or(FsError::NotFound)?;
        record.times.atime = now;

        let size = record.data.len();
        if size == 0 {
            return Ok(0);
        }
        let start = match usize::try_from(offset) {
            Ok(start) if start < size => start,
            _ => {
                if offset > size as u64 {
                    warn!(name, offset, size, "read offset past end of file");
                }
                return Ok(0);
            }
        };

        let count = buf.len().min(size - start);
        buf[..count].copy_from_slice(&record.data[start..start + count]);
        debug!(name, offset, requested = buf.len(), count, "read");
        Ok(count)
    }

    /// Write `data` at `offset`, growing the file when the write ends past it.
    pub fn write(&self, path: impl AsRef<Path>, offset: u64, data: &[u8]) -> FsResult<usize> {
        let name = file_name(path.as_ref())?;
        let now = self.clock.now();
        let mut state = self.lock();
        let record = state.files.get_mut(name).ok_or(FsError::NotFound)?;

        let start = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;
        let end = start.checked_add(data.len()).ok_or(FsError::InvalidArgument)?;
        if end > record.data.len() {
            record.resize(end)?;
        }
        record.data[start..end].copy_from_slice(data);
        record.touch_modified(now);

        debug!(name, offset, count = data.len(), size = record.size(), "wrote");
        Ok(data.len())
    }

    /// Set the file size to exactly `new_size` bytes
    pub fn truncate(&self, path: impl AsRef<Path>, new_size: u64) -> FsResult<()> {
        let name = file_name(path.as_ref())?;
        let now = self.clock.now();
        let mut state = self.lock();
        let record = state.files.get_mut(name).ok_or(FsError::NotFound)?;

        let len = usize::try_from(new_size).map_err(|_| FsError::NoSpace)?;
        record.resize(len)?;
        record.touch_modified(now);
        debug!(name, size = new_size, "truncated");
        Ok(())
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        match resolve(path.as_ref()) {
            Ok(Target::Root) => true,
            Ok(Target::File(name)) => self.lock().files.contains_key(name),
            Err(_) => false,
        }
    }

    /// Number of files in the store
    pub fn len(&self) -> usize {
        self.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn open_files(&self) -> usize {
        self.lock().open_files.value()
    }

    pub fn stats(&self) -> FsStats {
        let state = self.lock();
        FsStats {
            files: state.files.len(),
            open_files: state.open_files.value(),
            bytes_in_memory: state.files.values().map(FileRecord::size).sum(),
        }
    }

    /// File names in table iteration order
    pub(crate) fn names(&self) -> Vec<String> {
        self.lock().files.values().map(|record| record.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn small_config() -> FsConfig {
        FsConfig {
            limits: FsLimits {
                name_length: 8,
                max_dir_entries: 3,
                max_open_files: 2,
            },
            owner: Some(Owner { uid: 1000, gid: 100 }),
            ..FsConfig::default()
        }
    }

    /// Store whose clock returns whatever `time` holds
    fn store_with_time(time: Arc<AtomicI64>) -> FileStore {
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || time.load(Ordering::SeqCst));
        FileStore::with_clock(&small_config(), Box::new(clock))
    }

    fn read_all(store: &FileStore, path: &str) -> Vec<u8> {
        let mut buf = vec![0u8; 4096];
        let n = store.read(path, 0, &mut buf).unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn create_sets_metadata() {
        let time = Arc::new(AtomicI64::new(100));
        let store = store_with_time(time);

        store.create("/a.txt", libc::S_IFREG as u32 | 0o640).unwrap();

        let attr = store.stat("/a.txt").unwrap();
        assert_eq!(attr.kind, FileKind::RegularFile);
        assert_eq!(attr.perm, 0o640);
        assert_eq!(attr.mode(), libc::S_IFREG as u32 | 0o640);
        assert_eq!(attr.nlink, 1);
        assert_eq!(attr.len, 0);
        assert_eq!((attr.uid, attr.gid), (1000, 100));
        assert_eq!(attr.times, FileTimes::all(100));
    }

    #[test]
    fn create_checks_name_existence_and_capacity() {
        let store = FileStore::new(&small_config());

        assert_eq!(store.create("/123456789", 0o644), Err(FsError::NameTooLong));
        store.create("/12345678", 0o644).unwrap();
        assert_eq!(store.create("/12345678", 0o644), Err(FsError::AlreadyExists));
        assert_eq!(store.create("/", 0o755), Err(FsError::AlreadyExists));
        assert_eq!(store.create("/..", 0o644), Err(FsError::AlreadyExists));
        assert_eq!(store.create("/dir/a", 0o644), Err(FsError::NotFound));
        assert_eq!(store.create("a", 0o644), Err(FsError::InvalidArgument));

        store.create("/b", 0o644).unwrap();
        store.create("/c", 0o644).unwrap();
        assert_eq!(store.create("/d", 0o644), Err(FsError::NoSpace));
        assert_eq!(store.len(), 3);
        assert!(!store.exists("/d"));
    }

    #[test]
    fn delete_releases_file() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.write("/a", 0, b"content").unwrap();

        store.delete("/a").unwrap();
        assert!(!store.exists("/a"));
        assert_eq!(store.delete("/a"), Err(FsError::NotFound));
        assert_eq!(store.delete("/"), Err(FsError::NotFound));
        assert_eq!(store.stats().bytes_in_memory, 0);
    }

    #[test]
    fn delete_all_empties_store() {
        let store = FileStore::new(&small_config());
        for name in ["/a", "/b", "/c"] {
            store.create(name, 0o644).unwrap();
            store.write(name, 0, name.as_bytes()).unwrap();
        }

        assert_eq!(store.delete_all(), 3);
        assert!(store.is_empty());
        assert_eq!(store.delete_all(), 0);
    }

    #[test]
    fn rename_moves_record() {
        let time = Arc::new(AtomicI64::new(10));
        let store = store_with_time(time.clone());
        store.create("/a", 0o600).unwrap();
        store.write("/a", 0, b"payload").unwrap();

        time.store(20, Ordering::SeqCst);
        store.rename("/a", "/b").unwrap();

        assert!(!store.exists("/a"));
        let attr = store.stat("/b").unwrap();
        assert_eq!(attr.perm, 0o600);
        assert_eq!(attr.times.ctime, 20);
        assert_eq!(attr.times.mtime, 10);
        assert_eq!(read_all(&store, "/b"), b"payload");
        assert_eq!(store.names(), vec!["b".to_string()]);
    }

    #[test]
    fn rename_replaces_destination() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.create("/b", 0o644).unwrap();
        store.write("/a", 0, b"from a").unwrap();
        store.write("/b", 0, b"from b, longer").unwrap();

        store.rename("/a", "/b").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(read_all(&store, "/b"), b"from a");
        assert_eq!(store.stats().bytes_in_memory, 6);
    }

    #[test]
    fn rename_missing_source_leaves_store_untouched() {
        let store = FileStore::new(&small_config());
        store.create("/b", 0o644).unwrap();

        assert_eq!(store.rename("/a", "/b"), Err(FsError::NotFound));
        assert!(store.exists("/b"));
        assert_eq!(store.rename("/a", "/123456789"), Err(FsError::NotFound));
        assert_eq!(store.rename("/a", "/"), Err(FsError::NotFound));
        assert_eq!(store.rename("/b", "/123456789"), Err(FsError::NameTooLong));
        assert_eq!(store.rename("/b", "/"), Err(FsError::InvalidArgument));
        assert_eq!(store.rename("/b", "/."), Err(FsError::InvalidArgument));
        assert!(store.exists("/b"));
    }

    #[test]
    fn rename_onto_itself_is_noop() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.write("/a", 0, b"keep").unwrap();

        store.rename("/a", "/a").unwrap();
        assert_eq!(read_all(&store, "/a"), b"keep");
    }

    #[test]
    fn stat_root_and_missing() {
        let store = FileStore::new(&small_config());

        let root = store.stat("/").unwrap();
        assert_eq!(root.kind, FileKind::Directory);
        assert_eq!(root.nlink, 2);
        assert_eq!(root.perm, 0o755);
        assert_eq!(root.mode(), libc::S_IFDIR as u32 | 0o755);
        assert_eq!((root.uid, root.gid), (1000, 100));

        assert_eq!(store.stat("/missing"), Err(FsError::NotFound));
    }

    #[test]
    fn chmod_and_chown() {
        let time = Arc::new(AtomicI64::new(1));
        let store = store_with_time(time.clone());
        store.create("/a", 0o644).unwrap();

        time.store(2, Ordering::SeqCst);
        store.chmod("/a", 0o100600).unwrap();
        let attr = store.stat("/a").unwrap();
        assert_eq!(attr.perm, 0o600);
        assert_eq!(attr.times.ctime, 2);

        time.store(3, Ordering::SeqCst);
        store.chown("/a", Some(42), None).unwrap();
        store.chown("/a", None, Some(7)).unwrap();
        let attr = store.stat("/a").unwrap();
        assert_eq!((attr.uid, attr.gid), (42, 7));
        assert_eq!(attr.times, FileTimes { atime: 1, mtime: 1, ctime: 2 });

        assert_eq!(store.chmod("/nope", 0o644), Err(FsError::NotFound));
        assert_eq!(store.chown("/nope", Some(1), Some(1)), Err(FsError::NotFound));
    }

    #[test]
    fn open_close_accounting() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.create("/b", 0o644).unwrap();

        assert_eq!(store.open("/missing"), Err(FsError::NotFound));
        store.open("/a").unwrap();
        store.open("/b").unwrap();
        assert_eq!(store.open("/a"), Err(FsError::TooManyOpenFiles));
        assert_eq!(store.open_files(), 2);

        store.close("/b").unwrap();
        store.open("/a").unwrap();

        store.close("/a").unwrap();
        store.close("/a").unwrap();
        assert_eq!(store.close("/a"), Err(FsError::InvalidState));
        assert_eq!(store.close("/missing"), Err(FsError::NotFound));
        assert_eq!(store.open_files(), 0);
    }

    #[test]
    fn init_resets_open_counter() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.open("/a").unwrap();
        store.open("/a").unwrap();

        store.init();
        assert_eq!(store.open_files(), 0);
        store.open("/a").unwrap();
    }

    #[test]
    fn read_clamps_to_file_size() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();

        let mut buf = [0xffu8; 8];
        assert_eq!(store.read("/a", 0, &mut buf).unwrap(), 0);
        assert_eq!(store.read("/a", 100, &mut buf).unwrap(), 0);

        store.write("/a", 0, b"abcdef").unwrap();
        assert_eq!(store.read("/a", 4, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(store.read("/a", 6, &mut buf).unwrap(), 0);
        assert_eq!(store.read("/a", 7, &mut buf).unwrap(), 0);
        assert_eq!(store.read("/a", u64::MAX, &mut buf).unwrap(), 0);

        let mut small = [0u8; 3];
        assert_eq!(store.read("/a", 1, &mut small).unwrap(), 3);
        assert_eq!(&small, b"bcd");

        assert_eq!(store.read("/missing", 0, &mut buf), Err(FsError::NotFound));
    }

    #[test]
    fn read_updates_access_time_only() {
        let time = Arc::new(AtomicI64::new(5));
        let store = store_with_time(time.clone());
        store.create("/a", 0o644).unwrap();
        store.write("/a", 0, b"x").unwrap();

        time.store(9, Ordering::SeqCst);
        read_all(&store, "/a");
        assert_eq!(store.stat("/a").unwrap().times, FileTimes { atime: 9, mtime: 5, ctime: 5 });
    }

    #[test]
    fn write_overwrites_and_grows() {
        let time = Arc::new(AtomicI64::new(1));
        let store = store_with_time(time.clone());
        store.create("/a", 0o644).unwrap();

        assert_eq!(store.write("/a", 0, b"hello world").unwrap(), 11);
        time.store(2, Ordering::SeqCst);
        assert_eq!(store.write("/a", 6, b"there").unwrap(), 5);
        assert_eq!(read_all(&store, "/a"), b"hello there");

        assert_eq!(store.write("/a", 9, b"re, friend").unwrap(), 10);
        assert_eq!(read_all(&store, "/a"), b"hello there, friend");
        let attr = store.stat("/a").unwrap();
        assert_eq!(attr.len, 19);
        assert_eq!(attr.times, FileTimes::all(2));
    }

    #[test]
    fn write_past_end_zero_fills_gap() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.write("/a", 0, b"ab").unwrap();

        store.write("/a", 5, b"z").unwrap();
        assert_eq!(read_all(&store, "/a"), b"ab\0\0\0z");
        assert_eq!(store.stat("/a").unwrap().len, 6);
    }

    #[test]
    fn write_rejects_overflowing_range() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.write("/a", 0, b"ab").unwrap();

        assert_eq!(store.write("/a", u64::MAX, b"x"), Err(FsError::InvalidArgument));
        assert_eq!(store.stat("/a").unwrap().len, 2);
        assert_eq!(store.write("/missing", 0, b"x"), Err(FsError::NotFound));
    }

    #[test]
    fn truncate_shrinks_and_grows() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.write("/a", 0, b"abcdef").unwrap();

        store.truncate("/a", 3).unwrap();
        assert_eq!(read_all(&store, "/a"), b"abc");

        store.truncate("/a", 5).unwrap();
        assert_eq!(read_all(&store, "/a"), b"abc\0\0");

        store.truncate("/a", 0).unwrap();
        assert_eq!(store.stat("/a").unwrap().len, 0);
        assert!(read_all(&store, "/a").is_empty());

        assert_eq!(store.truncate("/missing", 1), Err(FsError::NotFound));
    }

    #[test]
    fn truncate_while_open_behaves_the_same() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.open("/a").unwrap();
        store.write("/a", 0, b"abcdef").unwrap();

        store.truncate("/a", 2).unwrap();
        assert_eq!(read_all(&store, "/a"), b"ab");
        assert_eq!(store.open_files(), 1);
    }

    #[test]
    fn stats_reflect_content() {
        let store = FileStore::new(&small_config());
        store.create("/a", 0o644).unwrap();
        store.create("/b", 0o644).unwrap();
        store.write("/a", 0, b"1234").unwrap();
        store.truncate("/b", 10).unwrap();
        store.open("/a").unwrap();

        assert_eq!(
            store.stats(),
            FsStats {
                files: 2,
                open_files: 1,
                bytes_in_memory: 14,
            }
        );
    }

    #[test]
    fn store_is_shareable_across_threads() {
        let store = Arc::new(FileStore::new(&FsConfig::default()));
        store.create("/shared", 0o644).unwrap();

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.write("/shared", u64::from(i) * 4, &[i; 4]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = read_all(&store, "/shared");
        assert_eq!(content.len(), 16);
        for i in 0..4u8 {
            let start = usize::from(i) * 4;
            assert_eq!(&content[start..start + 4], &[i; 4]);
        }
    }
}
