// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration types for MemFS Core

use serde::{Deserialize, Serialize};

use crate::Owner;

/// Maximum length of a file name in bytes (without the leading `/`)
pub const NAME_LENGTH: usize = 255;

/// Maximum number of files the root directory can hold
pub const NUM_DIR_ENTRIES: usize = 64;

/// Maximum number of concurrently open files
pub const NUM_OPEN_FILES: usize = 64;

/// Capacity limits enforced by the file store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsLimits {
    pub name_length: usize,
    pub max_dir_entries: usize,
    pub max_open_files: usize,
}

impl Default for FsLimits {
    fn default() -> Self {
        Self {
            name_length: NAME_LENGTH,
            max_dir_entries: NUM_DIR_ENTRIES,
            max_open_files: NUM_OPEN_FILES,
        }
    }
}

/// Kernel cache TTLs handed out with attribute and entry replies
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub attr_ttl_ms: u32,
    pub entry_ttl_ms: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            attr_ttl_ms: 1000,
            entry_ttl_ms: 1000,
        }
    }
}

/// Filesystem configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub limits: FsLimits,
    /// Identity owning the root directory and newly created files.
    /// `None` means uid/gid 0; the FUSE host fills in the mounting user.
    pub owner: Option<Owner>,
    pub cache: CachePolicy,
}

impl FsConfig {
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn owner(&self) -> Owner {
        self.owner.unwrap_or_default()
    }
}
