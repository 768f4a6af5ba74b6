// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Asynchronous subprocess execution.
//!
//! ```text
//! Subprocess::new()
//!   .add_argument("cc") / .add_file_argument(file, usage)
//!   .capture_stdout() / .capture_stderr() / .capture_stdout_and_stderr()
//!   .start(scheduler, callback)
//!       --> fork()
//!           child:  dup2 pipes onto fd 1/2, execvp | execv, _exit(1)
//!           parent: Running, close write ends, watch pid
//!
//!   exit notification ----+
//!                         +--> callback(ProcessExit), exactly once
//!   pipe_done() x N ------+
//!
//!   drop while running --> cancel watch, SIGKILL, waitpid, no callback
//! ```
//!
//! Captured read ends are drained by [`drain_pipe`] / [`drain_pipe_async`];
//! the caller reports each closed stream with [`Subprocess::pipe_done`].

mod child;
mod pipe;
mod reader;
mod subprocess;

#[cfg(test)]
mod tests;

pub use reader::{drain_pipe, drain_pipe_async};
pub use subprocess::{ExecutableLookup, ProcessState, Subprocess};
