// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Capture pipes.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use crate::error::ProcessError;

/// Write end of a capture pipe, kept by the parent until the child is forked.
///
/// Both ends are close-on-exec; the child gets its copy through `dup2`.
#[derive(Debug)]
pub(super) struct Pipe {
    write_end: OwnedFd,
}

impl Pipe {
    /// Opens a pipe and returns its read end alongside the retained write end.
    pub(super) fn open(stream: &'static str) -> Result<(OwnedFd, Self), ProcessError> {
        let (read_end, write_end) =
            pipe2(OFlag::O_CLOEXEC).map_err(|errno| ProcessError::PipeFailed {
                stream,
                source: errno.into(),
            })?;
        Ok((read_end, Self { write_end }))
    }

    pub(super) fn write_fd(&self) -> RawFd {
        self.write_end.as_raw_fd()
    }
}
