// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Inode numbers for the names in the flat namespace
//!
//! The file store is keyed by name; the kernel talks in inode numbers.
//! Inode 1 is the root directory. Every file name gets a number the first
//! time the kernel sees it, keeps it across renames and loses it on unlink.

use std::collections::HashMap;

/// Inode of the root directory (matches `fuser::FUSE_ROOT_ID`)
pub const ROOT_INO: u64 = 1;

#[derive(Debug)]
pub struct InodeTable {
    names: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next_inode: u64,
}

impl InodeTable {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
            inodes: HashMap::new(),
            next_inode: ROOT_INO + 1,
        }
    }

    /// File name for an inode; `None` for the root and for unknown inodes
    pub fn name(&self, ino: u64) -> Option<&str> {
        self.names.get(&ino).map(String::as_str)
    }

    /// Store path (`/name`) for an inode
    pub fn path(&self, ino: u64) -> Option<String> {
        if ino == ROOT_INO {
            return Some("/".to_string());
        }
        self.name(ino).map(|name| format!("/{name}"))
    }

    pub fn get_or_alloc(&mut self, name: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(name) {
            return ino;
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.names.insert(ino, name.to_string());
        self.inodes.insert(name.to_string(), ino);
        ino
    }

    pub fn remove(&mut self, name: &str) -> Option<u64> {
        let ino = self.inodes.remove(name)?;
        self.names.remove(&ino);
        Some(ino)
    }

    /// Follow a rename: `from`'s inode now names `to`; whatever `to` had is dropped.
    pub fn rename(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.remove(to);
        if let Some(ino) = self.inodes.remove(from) {
            self.names.insert(ino, to.to_string());
            self.inodes.insert(to.to_string(), ino);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
