// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process-exit notification.
//!
//! ```text
//! Subprocess::start()
//!   scheduler.on_process_exit(pid, callback) --> CancellationToken
//!
//! ChildReaper::run(interval)
//!   loop:
//!     poll(), per watched pid:
//!       cancelled watch   --> dropped, child left alone
//!       waitpid(WNOHANG)  --> Exited(code) | Signaled(signo)
//!       deliver callback at once (no borrow held)
//!     no watches left     --> return
//!     wait SIGCHLD | interval
//! ```
//!
//! The reaper is single-threaded. Callbacks run on the thread that polls and
//! may register further watches.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::ownership::{Owned, OwnedMap};

/// How a watched child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Normal exit with the given status code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
}

impl ProcessExit {
    /// Returns `true` for a zero exit status.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(signo) => write!(f, "killed by signal {signo}"),
        }
    }
}

/// One-shot callback receiving a child's exit outcome.
pub type ExitCallback = Owned<dyn FnOnce(ProcessExit)>;

/// Wraps a closure as an [`ExitCallback`].
pub fn exit_callback(callback: impl FnOnce(ProcessExit) + 'static) -> ExitCallback {
    Owned::from_box(Box::new(callback))
}

/// Delivers process-exit notifications.
///
/// The callback is invoked at most once, on the scheduler's thread, unless the
/// returned token is cancelled first.
pub trait ExitScheduler {
    fn on_process_exit(&self, pid: Pid, callback: ExitCallback) -> CancellationToken;
}

struct ExitWatch {
    callback: ExitCallback,
    token: CancellationToken,
}

/// Minimal [`ExitScheduler`] that reaps its own children with `waitpid`.
///
/// Only children registered through [`on_process_exit`](ExitScheduler::on_process_exit)
/// are reaped.
pub struct ChildReaper {
    watches: RefCell<OwnedMap<i32, ExitWatch>>,
}

impl ChildReaper {
    #[must_use]
    pub fn new() -> Self {
        Self {
            watches: RefCell::new(OwnedMap::new()),
        }
    }

    /// Number of registered watches, cancelled ones included until the next poll.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.watches.borrow().len()
    }

    /// Returns `true` when nothing is being watched.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.watches.borrow().is_empty()
    }

    /// Reaps every watched child that has terminated and delivers its callback.
    ///
    /// Each callback runs right after its own `waitpid`, so a reaped child
    /// never has a pending watch while another callback runs.
    ///
    /// Returns the number of callbacks delivered.
    pub fn poll(&self) -> usize {
        let pids: Vec<i32> = self.watches.borrow().keys().copied().collect();

        let mut delivered = 0;
        for raw in pids {
            let Some((watch, exit)) = self.reap(raw) else {
                continue;
            };
            if let Some(callback) = watch.callback.into_box() {
                callback(exit);
                delivered += 1;
            }
        }
        delivered
    }

    fn reap(&self, raw: i32) -> Option<(ExitWatch, ProcessExit)> {
        let mut watches = self.watches.borrow_mut();
        // An earlier callback may have cancelled it.
        if watches.get(&raw)?.token.is_cancelled() {
            trace!(pid = raw, "exit watch cancelled");
            watches.erase(&raw);
            return None;
        }

        let exit = match waitpid(Pid::from_raw(raw), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => {
                trace!(pid = raw, code, "child exited");
                ProcessExit::Exited(code)
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                trace!(pid = raw, signal = %signal, "child killed by signal");
                ProcessExit::Signaled(signal as i32)
            }
            Ok(_) | Err(Errno::EINTR) => return None,
            Err(Errno::ECHILD) => {
                warn!(pid = raw, "watched child was reaped elsewhere, dropping watch");
                watches.erase(&raw);
                return None;
            }
            Err(e) => {
                warn!(pid = raw, error = %e, "waitpid failed");
                return None;
            }
        };
        let watch = watches.release(&raw)?.into_inner()?;
        Some((watch, exit))
    }

    /// Drives the watches until none remain.
    ///
    /// Wakes on `SIGCHLD` and, as a fallback, every `interval`.
    ///
    /// # Errors
    ///
    /// Returns an error if the `SIGCHLD` handler cannot be installed.
    pub async fn run(&self, interval: Duration) -> std::io::Result<()> {
        let mut sigchld = signal(SignalKind::child())?;
        debug!(
            watches = self.pending(),
            interval_ms = interval.as_millis(),
            "reaping children"
        );
        loop {
            self.poll();
            if self.is_idle() {
                return Ok(());
            }
            tokio::select! {
                _ = sigchld.recv() => {}
                () = tokio::time::sleep(interval) => {}
            }
        }
    }
}

impl ExitScheduler for ChildReaper {
    fn on_process_exit(&self, pid: Pid, callback: ExitCallback) -> CancellationToken {
        let token = CancellationToken::new();
        let watch = ExitWatch {
            callback,
            token: token.clone(),
        };
        let mut watches = self.watches.borrow_mut();
        if watches.contains(&pid.as_raw()) {
            warn!(pid = pid.as_raw(), "replacing existing exit watch");
        }
        watches.add(pid.as_raw(), Owned::new(watch));
        trace!(pid = pid.as_raw(), "watching for exit");
        token
    }
}

impl Default for ChildReaper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChildReaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildReaper")
            .field("pending", &self.pending())
            .finish()
    }
}
