// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//! Library layer (typed, thiserror)
//!   ConfigError   ParseError, InvalidValue
//!   ProcessError  NoProgram, InvalidArgument, PipeFailed, ForkFailed, Materialize
//!                                                                     |
//!   FsError       NotFound, PermissionDenied, IoError  <---------------+
//!
//! Application layer (anyhow)
//!   Result<T> = anyhow::Result<T>, context added at each command boundary
//! ```
//!
//! A program that could not be executed is not an error at this layer: the
//! child exits with a non-zero status like any failing tool.

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("failed to parse config '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Process Errors ---

/// Errors raised while configuring or starting a subprocess.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// `start` was called before any argument was added.
    #[error("no program given: the argument list is empty")]
    NoProgram,

    /// An argument cannot be passed to `exec`.
    #[error("argument {index} contains an interior NUL byte")]
    InvalidArgument { index: usize },

    /// Creating a capture pipe failed.
    #[error("failed to create {stream} pipe")]
    PipeFailed {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// `fork` failed; nothing was started.
    #[error("failed to fork '{command}'")]
    ForkFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A file argument could not be materialized on disk.
    #[error("failed to materialize file argument: {0}")]
    Materialize(#[from] FsError),
}

// --- Filesystem Errors ---

/// Filesystem operation errors.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path not found.
    #[error("path not found: {0}")]
    NotFound(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// General I/O error.
    #[error("I/O error on '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Classifies an I/O error raised for `path`.
    pub fn from_io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::IoError { path, source },
        }
    }
}

#[cfg(test)]
mod tests;
