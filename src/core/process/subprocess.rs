// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Subprocess lifecycle and completion join.
//!
//! ```text
//! NotStarted --start()--> Running --exit--> Exited(code) | Signaled(signo)
//!                            |
//!                            +--drop--> SIGKILL + waitpid (no callback)
//!
//! completion = exit recorded && pending pipes == 0
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::fd::OwnedFd;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, fork};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::child::{ExecPlan, Redirects, exec_child};
use super::pipe::Pipe;
use crate::core::events::{ExitScheduler, ProcessExit, exit_callback};
use crate::core::file::{DiskRef, FileUsage, VirtualFile};
use crate::error::ProcessError;
use crate::ownership::{Owned, OwnedVec, Shared, WeakRef};

/// How the program named by the first argument is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutableLookup {
    /// Search `PATH` (`execvp`).
    #[default]
    SearchPath,
    /// Use the argument as a path (`execv`).
    Exact,
}

/// Lifecycle of a [`Subprocess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessState {
    #[default]
    NotStarted,
    Running,
    Exited(i32),
    Signaled(i32),
}

impl ProcessState {
    const fn outcome(self) -> Option<ProcessExit> {
        match self {
            Self::Exited(code) => Some(ProcessExit::Exited(code)),
            Self::Signaled(signo) => Some(ProcessExit::Signaled(signo)),
            Self::NotStarted | Self::Running => None,
        }
    }
}

impl From<ProcessExit> for ProcessState {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Exited(code) => Self::Exited(code),
            ProcessExit::Signaled(signo) => Self::Signaled(signo),
        }
    }
}

type CompletionCallback = Owned<dyn FnOnce(ProcessExit)>;

#[derive(Default)]
struct SubprocessInner {
    args: Vec<OsString>,
    lookup: ExecutableLookup,
    disk_refs: OwnedVec<dyn DiskRef>,
    stdout_pipe: Shared<Pipe>,
    stderr_pipe: Shared<Pipe>,
    combined_pipe: Shared<Pipe>,
    pipe_count: usize,
    pid: Option<Pid>,
    state: ProcessState,
    canceler: Option<CancellationToken>,
    callback: CompletionCallback,
}

impl SubprocessInner {
    fn command_line(&self) -> String {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn push_argument(&mut self, arg: OsString, lookup: ExecutableLookup) {
        if self.args.is_empty() {
            self.lookup = lookup;
        }
        self.args.push(arg);
    }

    fn redirects(&self) -> Redirects {
        let fd = |pipe: &Shared<Pipe>| pipe.get().map(|pipe| pipe.write_fd());
        Redirects {
            stdout: fd(&self.stdout_pipe),
            stderr: fd(&self.stderr_pipe),
            combined: fd(&self.combined_pipe),
        }
    }

    /// Closes the parent's write ends and counts the streams to wait for.
    fn close_write_ends(&mut self) {
        for pipe in [
            &mut self.stdout_pipe,
            &mut self.stderr_pipe,
            &mut self.combined_pipe,
        ] {
            if !pipe.is_empty() {
                self.pipe_count += 1;
                pipe.clear();
            }
        }
    }
}

/// An external program run asynchronously.
///
/// Completion fires once the exit status is known and every captured stream
/// has been reported closed through [`pipe_done`](Self::pipe_done), whichever
/// comes last. Dropping a running subprocess kills and reaps it without
/// invoking the callback.
pub struct Subprocess {
    inner: Shared<SubprocessInner>,
}

impl Subprocess {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Shared::new(SubprocessInner::default()),
        }
    }

    /// Appends a literal argument. As the first argument it names a program
    /// looked up on `PATH`.
    pub fn add_argument(&mut self, arg: impl AsRef<OsStr>) {
        self.inner
            .borrow_mut()
            .push_argument(arg.as_ref().to_os_string(), ExecutableLookup::SearchPath);
    }

    /// Materializes `file` and appends its on-disk path. As the first argument
    /// it names the program by exact path.
    ///
    /// The disk reference stays pinned until the process exits or this
    /// subprocess is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Materialize`] if the file cannot be placed on disk.
    pub fn add_file_argument(
        &mut self,
        file: &dyn VirtualFile,
        usage: FileUsage,
    ) -> Result<(), ProcessError> {
        let disk_ref = file.materialize(usage)?;
        let path = disk_ref.path().as_os_str().to_os_string();
        let mut inner = self.inner.borrow_mut();
        inner.push_argument(path, ExecutableLookup::Exact);
        inner.disk_refs.add(disk_ref);
        Ok(())
    }

    /// Captures the child's stdout and returns the read end.
    ///
    /// Cancels combined capture.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::PipeFailed`] if the pipe cannot be created.
    pub fn capture_stdout(&mut self) -> Result<OwnedFd, ProcessError> {
        let (read_end, pipe) = Pipe::open("stdout")?;
        let mut inner = self.inner.borrow_mut();
        inner.combined_pipe.clear();
        inner.stdout_pipe.allocate(pipe);
        Ok(read_end)
    }

    /// Captures the child's stderr and returns the read end.
    ///
    /// Cancels combined capture.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::PipeFailed`] if the pipe cannot be created.
    pub fn capture_stderr(&mut self) -> Result<OwnedFd, ProcessError> {
        let (read_end, pipe) = Pipe::open("stderr")?;
        let mut inner = self.inner.borrow_mut();
        inner.combined_pipe.clear();
        inner.stderr_pipe.allocate(pipe);
        Ok(read_end)
    }

    /// Captures stdout and stderr interleaved through one pipe and returns its
    /// read end.
    ///
    /// Cancels separate stdout and stderr capture.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::PipeFailed`] if the pipe cannot be created.
    pub fn capture_stdout_and_stderr(&mut self) -> Result<OwnedFd, ProcessError> {
        let (read_end, pipe) = Pipe::open("stdout+stderr")?;
        let mut inner = self.inner.borrow_mut();
        inner.stdout_pipe.clear();
        inner.stderr_pipe.clear();
        inner.combined_pipe.allocate(pipe);
        Ok(read_end)
    }

    /// Forks and executes the program.
    ///
    /// `callback` receives the exit outcome once the process has exited and
    /// every captured stream has been reported closed.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::NoProgram`] or [`ProcessError::InvalidArgument`]
    /// if the arguments cannot be executed, and [`ProcessError::ForkFailed`] if
    /// `fork` fails. Nothing is registered with `scheduler` in these cases.
    ///
    /// # Panics
    ///
    /// Panics if the subprocess was already started.
    pub fn start(
        &mut self,
        scheduler: &dyn ExitScheduler,
        callback: impl FnOnce(ProcessExit) + 'static,
    ) -> Result<(), ProcessError> {
        let pid = {
            let mut inner = self.inner.borrow_mut();
            assert!(
                inner.state == ProcessState::NotStarted,
                "subprocess started twice"
            );

            let plan = ExecPlan::new(&inner.args, inner.lookup)?;
            let redirects = inner.redirects();
            let command = inner.command_line();
            debug!(command = %command, lookup = ?inner.lookup, "exec");

            // SAFETY: the child runs `exec_child`, which only calls `dup2`,
            // `exec`, `write` and `_exit` on data prepared in `plan`.
            let pid = match unsafe { fork() } {
                Ok(ForkResult::Child) => exec_child(&plan, redirects),
                Ok(ForkResult::Parent { child }) => child,
                Err(errno) => {
                    return Err(ProcessError::ForkFailed {
                        command,
                        source: errno.into(),
                    });
                }
            };

            trace!(pid = pid.as_raw(), command = %command, "spawned");
            inner.pid = Some(pid);
            inner.state = ProcessState::Running;
            inner.close_write_ends();
            inner.callback = Owned::from_box(Box::new(callback));
            pid
        };

        let weak = self.inner.downgrade();
        let token = scheduler.on_process_exit(
            pid,
            exit_callback(move |exit| Self::process_exited(&weak, exit)),
        );

        let mut inner = self.inner.borrow_mut();
        if inner.state == ProcessState::Running {
            inner.canceler = Some(token);
        }
        Ok(())
    }

    /// Reports that one captured stream reached end of file.
    ///
    /// # Panics
    ///
    /// Panics if no captured stream is pending.
    pub fn pipe_done(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            assert!(inner.pipe_count > 0, "pipe_done without a pending pipe");
            inner.pipe_count -= 1;
            trace!(
                pid = inner.pid.map(Pid::as_raw),
                remaining = inner.pipe_count,
                "pipe closed"
            );
        }
        Self::maybe_complete(&self.inner);
    }

    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.inner.borrow().state
    }

    /// Process id while running; `None` before start and after exit.
    #[must_use]
    pub fn pid(&self) -> Option<Pid> {
        self.inner.borrow().pid
    }

    /// Captured streams not yet reported closed.
    #[must_use]
    pub fn pending_pipes(&self) -> usize {
        self.inner.borrow().pipe_count
    }

    #[must_use]
    pub fn lookup(&self) -> ExecutableLookup {
        self.inner.borrow().lookup
    }

    /// Arguments joined by spaces, for logging.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.inner.borrow().command_line()
    }

    fn process_exited(weak: &WeakRef<SubprocessInner>, exit: ProcessExit) {
        let inner = weak.upgrade();
        if inner.is_empty() {
            return;
        }

        let pinned = {
            let mut state = inner.borrow_mut();
            trace!(pid = state.pid.map(Pid::as_raw), %exit, "process exited");
            state.state = exit.into();
            state.canceler = None;
            state.pid = None;
            std::mem::take(&mut state.disk_refs)
        };
        drop(pinned);

        Self::maybe_complete(&inner);
    }

    fn maybe_complete(inner: &Shared<SubprocessInner>) {
        let (callback, exit) = {
            let mut state = inner.borrow_mut();
            let Some(exit) = state.state.outcome() else {
                return;
            };
            if state.pipe_count > 0 || state.callback.is_empty() {
                return;
            }
            (state.callback.release(), exit)
        };

        trace!(%exit, "subprocess complete");
        if let Some(callback) = callback.into_box() {
            callback(exit);
        }
    }
}

impl Default for Subprocess {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Subprocess {
    fn drop(&mut self) {
        let (token, pid) = {
            let mut inner = self.inner.borrow_mut();
            (inner.canceler.take(), inner.pid.take())
        };
        let Some(token) = token else {
            return;
        };
        token.cancel();

        let Some(pid) = pid else {
            return;
        };
        warn!(pid = pid.as_raw(), "subprocess dropped while running, killing");
        if let Err(e) = kill(pid, Signal::SIGKILL) {
            debug!(pid = pid.as_raw(), error = %e, "kill failed");
        }
        loop {
            match waitpid(pid, None) {
                Err(Errno::EINTR) => {}
                Err(e) => {
                    debug!(pid = pid.as_raw(), error = %e, "waitpid failed");
                    break;
                }
                Ok(_) => break,
            }
        }
    }
}

impl fmt::Debug for Subprocess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Subprocess")
            .field("command", &inner.command_line())
            .field("lookup", &inner.lookup)
            .field("state", &inner.state)
            .field("pending_pipes", &inner.pipe_count)
            .finish_non_exhaustive()
    }
}
