// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! MemFS FUSE adapter implementation
//!
//! Maps FUSE operations to file store calls.

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
compile_error!("This module requires the 'fuse' feature on Linux");

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};
use libc::{c_int, EINVAL, ENOENT, ENOSYS, ENOTDIR};
use memfs_core::{dir, Attributes, FileKind, FileStore, FsConfig, FsError, FsResult, Owner};
use tracing::{debug, info};

use crate::inodes::{InodeTable, ROOT_INO};

const _: () = assert!(ROOT_INO == FUSE_ROOT_ID);

/// MemFS FUSE filesystem adapter
pub struct MemFsFuse {
    store: Arc<FileStore>,
    /// TTL for attribute cache responses
    attr_ttl: Duration,
    /// TTL for directory entry cache responses
    entry_ttl: Duration,
    inodes: InodeTable,
}

impl MemFsFuse {
    pub fn new(config: &FsConfig) -> Self {
        Self {
            store: Arc::new(FileStore::new(config)),
            attr_ttl: Duration::from_millis(u64::from(config.cache.attr_ttl_ms)),
            entry_ttl: Duration::from_millis(u64::from(config.cache.entry_ttl_ms)),
            inodes: InodeTable::new(),
        }
    }

    pub fn store(&self) -> Arc<FileStore> {
        Arc::clone(&self.store)
    }

    /// Name of a root-directory child, validated for the store
    fn child_name<'a>(&self, parent: u64, name: &'a OsStr) -> Result<&'a str, c_int> {
        if parent != ROOT_INO {
            return Err(ENOENT);
        }
        name.to_str().ok_or(EINVAL)
    }

    fn path_for(&self, ino: u64) -> Result<String, c_int> {
        self.inodes.path(ino).ok_or(ENOENT)
    }

    fn attr_to_fuse(attr: &Attributes, ino: u64) -> FileAttr {
        let to_system_time =
            |secs: i64| SystemTime::UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64);
        let kind = match attr.kind {
            FileKind::Directory => FileType::Directory,
            FileKind::RegularFile => FileType::RegularFile,
        };

        FileAttr {
            ino,
            size: attr.len,
            blocks: attr.len.div_ceil(512),
            atime: to_system_time(attr.times.atime),
            mtime: to_system_time(attr.times.mtime),
            ctime: to_system_time(attr.times.ctime),
            crtime: to_system_time(attr.times.ctime),
            kind,
            perm: attr.perm as u16,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    /// Stat a root child and hand out its inode
    fn entry_for(&mut self, name: &str) -> Result<FileAttr, FsError> {
        let attr = self.store.stat(format!("/{name}"))?;
        let ino = self.inodes.get_or_alloc(name);
        Ok(Self::attr_to_fuse(&attr, ino))
    }

    /// Create a file owned by `owner`; on failure nothing of it is left behind
    fn create_file(
        &mut self,
        name: &str,
        mode: u32,
        umask: u32,
        owner: Owner,
    ) -> Result<FileAttr, FsError> {
        let path = format!("/{name}");
        self.store.create(&path, mode & !umask)?;
        let result = self
            .store
            .chown(&path, Some(owner.uid), Some(owner.gid))
            .and_then(|()| self.entry_for(name));
        if result.is_err() {
            self.discard(name);
        }
        result
    }

    /// Create a file and count it as open, as `creat(2)` does
    fn create_open_file(
        &mut self,
        name: &str,
        mode: u32,
        umask: u32,
        owner: Owner,
    ) -> Result<FileAttr, FsError> {
        let attr = self.create_file(name, mode, umask, owner)?;
        if let Err(err) = self.store.open(format!("/{name}")) {
            debug!(name, error = %err, "create: open failed, removing new file");
            self.discard(name);
            return Err(err);
        }
        Ok(attr)
    }

    /// Drop a half-created file from the store and the inode table
    fn discard(&mut self, name: &str) {
        let _ = self.store.delete(format!("/{name}"));
        self.inodes.remove(name);
    }

    fn unlink_file(&mut self, name: &str) -> FsResult<()> {
        self.store.delete(format!("/{name}"))?;
        self.inodes.remove(name);
        Ok(())
    }

    fn rename_file(&mut self, from: &str, to: &str) -> FsResult<()> {
        self.store.rename(format!("/{from}"), format!("/{to}"))?;
        self.inodes.rename(from, to);
        Ok(())
    }

    fn apply_setattr(
        &self,
        path: &str,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
    ) -> Result<Attributes, FsError> {
        if let Some(mode) = mode {
            self.store.chmod(path, mode)?;
        }
        if uid.is_some() || gid.is_some() {
            self.store.chown(path, uid, gid)?;
        }
        if let Some(size) = size {
            self.store.truncate(path, size)?;
        }
        self.store.stat(path)
    }
}

impl fuser::Filesystem for MemFsFuse {
    fn init(&mut self, _req: &Request, _config: &mut fuser::KernelConfig) -> Result<(), c_int> {
        self.store.init();
        info!("MemFS FUSE adapter initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        let removed = self.store.delete_all();
        info!(removed, "MemFS FUSE adapter destroyed");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match self.child_name(parent, name) {
            Ok(name) => name,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        match self.entry_for(name) {
            Ok(attr) => reply.entry(&self.entry_ttl, &attr, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let path = match self.path_for(ino) {
            Ok(path) => path,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        match self.store.stat(&path) {
            Ok(attr) => reply.attr(&self.attr_ttl, &Self::attr_to_fuse(&attr, ino)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path_for(ino) {
            Ok(path) if ino != ROOT_INO => path,
            Ok(_) | Err(_) => {
                reply.error(ENOENT);
                return;
            }
        };

        debug!(ino, ?mode, ?uid, ?gid, ?size, "setattr");
        match self.apply_setattr(&path, mode, uid, gid, size) {
            Ok(attr) => reply.attr(&self.attr_ttl, &Self::attr_to_fuse(&attr, ino)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn mknod(
        &mut self,
        req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let file_type = mode & libc::S_IFMT;
        if file_type != 0 && file_type != libc::S_IFREG {
            reply.error(ENOSYS);
            return;
        }
        let name = match self.child_name(parent, name) {
            Ok(name) => name,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        let owner = Owner {
            uid: req.uid(),
            gid: req.gid(),
        };
        match self.create_file(name, mode, umask, owner) {
            Ok(attr) => reply.entry(&self.entry_ttl, &attr, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn create(
        &mut self,
        req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let name = match self.child_name(parent, name) {
            Ok(name) => name,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        let owner = Owner {
            uid: req.uid(),
            gid: req.gid(),
        };
        match self.create_open_file(name, mode, umask, owner) {
            Ok(attr) => reply.created(&self.entry_ttl, &attr, 0, 0, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let result = match self.inodes.name(ino) {
            Some(name) => self.store.open(format!("/{name}")),
            None => Err(FsError::NotFound),
        };
        match result {
            Ok(()) => reply.opened(0, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(EINVAL);
            return;
        };
        let Some(name) = self.inodes.name(ino) else {
            reply.error(ENOENT);
            return;
        };

        let mut buf = vec![0u8; size as usize];
        match self.store.read(format!("/{name}"), offset, &mut buf) {
            Ok(bytes_read) => {
                buf.truncate(bytes_read);
                reply.data(&buf);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(EINVAL);
            return;
        };
        let Some(name) = self.inodes.name(ino) else {
            reply.error(ENOENT);
            return;
        };

        match self.store.write(format!("/{name}"), offset, data) {
            Ok(bytes_written) => reply.written(bytes_written as u32),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn flush(&mut self, _req: &Request, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        // Nothing is buffered outside the store
        reply.ok();
    }

    fn fsync(&mut self, _req: &Request, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let result = match self.inodes.name(ino) {
            Some(name) => self.store.close(format!("/{name}")),
            None => Err(FsError::NotFound),
        };
        match result {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if ino != ROOT_INO {
            reply.error(if self.inodes.name(ino).is_some() { ENOTDIR } else { ENOENT });
            return;
        }

        let entries = dir::list(&self.store, "/");
        for (i, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            let (entry_ino, kind) = match entry.kind {
                FileKind::Directory => (ROOT_INO, FileType::Directory),
                FileKind::RegularFile => {
                    (self.inodes.get_or_alloc(&entry.name), FileType::RegularFile)
                }
            };
            if reply.add(entry_ino, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = match self.child_name(parent, name) {
            Ok(name) => name,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        match self.unlink_file(name) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let names = self
            .child_name(parent, name)
            .and_then(|from| self.child_name(newparent, newname).map(|to| (from, to)));
        let (from, to) = match names {
            Ok(names) => names,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        match self.rename_file(from, to) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }
}
