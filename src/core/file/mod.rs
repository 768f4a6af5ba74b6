// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! File collaborators for subprocess arguments.
//!
//! ```text
//! VirtualFile::materialize(usage)
//!       |
//!       v
//! Owned<dyn DiskRef>  --> path() on disk, pinned while held
//!       |
//!       +-- dropped when the subprocess exits or is destroyed
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::FsError;
use crate::ownership::Owned;

/// How a subprocess is going to use a file argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileUsage {
    Read,
    Write,
    Update,
}

/// A file materialized at a real path. The file stays valid while the
/// reference is held.
pub trait DiskRef: fmt::Debug {
    fn path(&self) -> &Path;
}

/// A file known to the build tool that can be placed on disk on demand.
pub trait VirtualFile {
    /// Makes the file available on disk for `usage`.
    ///
    /// # Errors
    ///
    /// Returns an [`FsError`] if the file cannot be made available.
    fn materialize(&self, usage: FileUsage) -> Result<Owned<dyn DiskRef>, FsError>;
}

/// A plain file on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskFile {
    path: PathBuf,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check(&self, usage: FileUsage) -> Result<(), FsError> {
        let target = match usage {
            FileUsage::Read | FileUsage::Update => self.path.as_path(),
            // Only the directory has to exist for an output.
            FileUsage::Write => match self.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => return Ok(()),
            },
        };
        std::fs::metadata(target)
            .map(drop)
            .map_err(|e| FsError::from_io(target.display().to_string(), e))
    }
}

impl VirtualFile for DiskFile {
    fn materialize(&self, usage: FileUsage) -> Result<Owned<dyn DiskRef>, FsError> {
        self.check(usage)?;
        trace!(path = %self.path.display(), ?usage, "pinned file");
        Ok(Owned::from_box(Box::new(PinnedPath {
            path: self.path.clone(),
            usage,
        })))
    }
}

struct PinnedPath {
    path: PathBuf,
    usage: FileUsage,
}

impl DiskRef for PinnedPath {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PinnedPath {
    fn drop(&mut self) {
        trace!(path = %self.path.display(), usage = ?self.usage, "unpinned file");
    }
}

impl fmt::Debug for PinnedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedPath")
            .field("path", &self.path)
            .field("usage", &self.usage)
            .finish()
    }
}
