// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for MemFS Core

use libc::{c_int, EBADF, EEXIST, EINVAL, EMFILE, ENAMETOOLONG, ENOENT, ENOSPC};

/// Core filesystem error type
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("name too long")]
    NameTooLong,
    #[error("no space left")]
    NoSpace,
    #[error("too many open files")]
    TooManyOpenFiles,
    #[error("no open file to close")]
    InvalidState,
    #[error("invalid argument")]
    InvalidArgument,
}

impl FsError {
    /// errno reported to the kernel for this error
    pub fn errno(self) -> c_int {
        match self {
            FsError::NotFound => ENOENT,
            FsError::AlreadyExists => EEXIST,
            FsError::NameTooLong => ENAMETOOLONG,
            FsError::NoSpace => ENOSPC,
            FsError::TooManyOpenFiles => EMFILE,
            FsError::InvalidState => EBADF,
            FsError::InvalidArgument => EINVAL,
        }
    }

    /// Negative status code, as returned through a C-style filesystem interface.
    pub fn status(self) -> c_int {
        -self.errno()
    }
}

pub type FsResult<T> = Result<T, FsError>;
