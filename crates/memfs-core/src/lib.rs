// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! MemFS Core: a flat, volatile, in-memory file table
//!
//! The [`FileStore`] holds every file of a single root directory, with its
//! metadata and content, for as long as the process lives. [`dir::list`]
//! projects the store into directory entries. Kernel-facing adapters (see
//! `memfs-fuse-host`) translate requests into these calls and map
//! [`FsError`] values to errno codes.

pub mod clock;
pub mod config;
pub mod dir;
pub mod error;
pub mod store;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::{CachePolicy, FsConfig, FsLimits, NAME_LENGTH, NUM_DIR_ENTRIES, NUM_OPEN_FILES};
pub use error::{FsError, FsResult};
pub use store::FileStore;
pub use types::*;
