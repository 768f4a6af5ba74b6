// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Core modules for subprocess execution and its collaborators.
//!
//! ```text
//!              core
//!               |
//!     +---------+---------+
//!     |         |         |
//!     v         v         v
//!   events     file     process
//!     |         |         |
//!  ExitScheduler VirtualFile Subprocess
//!  ChildReaper   DiskRef     Pipe, drain_pipe
//!  ProcessExit   DiskFile    fork/exec (Unix)
//! ```

pub mod events;
pub mod file;
pub mod process;
