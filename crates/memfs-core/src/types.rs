// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for MemFS

use serde::{Deserialize, Serialize};

/// Numeric owner identity of a file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// File timestamps, in seconds since the Unix epoch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileTimes {
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl FileTimes {
    pub fn all(now: i64) -> Self {
        Self {
            atime: now,
            mtime: now,
            ctime: now,
        }
    }
}

/// Node kinds visible in the namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

impl FileKind {
    /// `S_IFMT` bits for this kind
    pub fn type_bits(self) -> u32 {
        match self {
            FileKind::Directory => libc::S_IFDIR as u32,
            FileKind::RegularFile => libc::S_IFREG as u32,
        }
    }
}

/// File attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub kind: FileKind,
    /// Permission bits only (no type bits)
    pub perm: u32,
    pub nlink: u32,
    pub len: u64,
    pub uid: u32,
    pub gid: u32,
    pub times: FileTimes,
}

impl Attributes {
    /// Full `st_mode`: type bits combined with permission bits
    pub fn mode(&self) -> u32 {
        self.kind.type_bits() | self.perm
    }
}

/// Directory entry information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

/// Filesystem statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FsStats {
    pub files: usize,
    pub open_files: usize,
    pub bytes_in_memory: u64,
}
