// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Child side of `fork`.
//!
//! Everything the child needs is prepared in the parent, including the
//! null-terminated argv pointer array. After `fork` the child only calls
//! `dup2`, `exec`, `write` and `_exit`, none of which allocate.

use std::ffi::{CString, OsString, c_char};
use std::os::fd::{BorrowedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::ptr;

use nix::errno::Errno;
use nix::libc::{self, STDERR_FILENO, STDOUT_FILENO};
use nix::unistd::{dup2, write};

use super::subprocess::ExecutableLookup;
use crate::error::ProcessError;

/// Argument vector converted for `exec`.
#[derive(Debug)]
pub(super) struct ExecPlan {
    argv: Vec<CString>,
    /// Pointers into `argv`, terminated by a null pointer.
    argv_ptrs: Vec<*const c_char>,
    lookup: ExecutableLookup,
}

impl ExecPlan {
    pub(super) fn new(args: &[OsString], lookup: ExecutableLookup) -> Result<Self, ProcessError> {
        if args.is_empty() {
            return Err(ProcessError::NoProgram);
        }
        let argv = args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                CString::new(arg.as_bytes()).map_err(|_| ProcessError::InvalidArgument { index })
            })
            .collect::<Result<Vec<CString>, _>>()?;
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();
        Ok(Self {
            argv,
            argv_ptrs,
            lookup,
        })
    }

    #[cfg(test)]
    pub(super) fn argv_ptrs(&self) -> &[*const c_char] {
        &self.argv_ptrs
    }
}

/// Descriptors to install as the child's stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Redirects {
    pub(super) stdout: Option<RawFd>,
    pub(super) stderr: Option<RawFd>,
    pub(super) combined: Option<RawFd>,
}

/// Runs in the forked child. Never returns.
pub(super) fn exec_child(plan: &ExecPlan, redirects: Redirects) -> ! {
    if let Some(fd) = redirects.combined {
        let _ = dup2(fd, STDOUT_FILENO);
        let _ = dup2(STDOUT_FILENO, STDERR_FILENO);
    } else {
        if let Some(fd) = redirects.stdout {
            let _ = dup2(fd, STDOUT_FILENO);
        }
        if let Some(fd) = redirects.stderr {
            let _ = dup2(fd, STDERR_FILENO);
        }
    }

    let program = plan.argv[0].as_ptr();
    // SAFETY: `argv_ptrs` is null-terminated and points into `plan.argv`,
    // which outlives the call. exec only returns on failure.
    unsafe {
        match plan.lookup {
            ExecutableLookup::SearchPath => libc::execvp(program, plan.argv_ptrs.as_ptr()),
            ExecutableLookup::Exact => libc::execv(program, plan.argv_ptrs.as_ptr()),
        };
    }
    report_exec_failure(Errno::last());
    // SAFETY: `_exit` terminates the child without running atexit handlers.
    unsafe { libc::_exit(1) }
}

fn report_exec_failure(errno: Errno) {
    // SAFETY: fd 2 stays open for the rest of the child's short life.
    let stderr = unsafe { BorrowedFd::borrow_raw(STDERR_FILENO) };
    let _ = write(stderr, b"exec: ");
    let _ = write(stderr, errno.desc().as_bytes());
    let _ = write(stderr, b"\n");
}
