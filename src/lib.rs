// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |             options / inis / run
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |          config           |
//!              |   TOML, layered settings  |
//!              '-------------+-------------'
//!                            |
//!   +------------------------v-----------------------+
//!   |  core   process (Subprocess, pipes, fork/exec) |
//!   |         events (ExitScheduler, ChildReaper)    |
//!   |         file (VirtualFile, DiskRef)            |
//!   +------------------------------------------------+
//!   |  ownership   Owned, Shared/WeakRef, OwnedVec,  |
//!   |              OwnedDeque, OwnedQueue, OwnedMap  |
//!   +------------------------------------------------+
//!   |  foundation   error, logging                   |
//!   +------------------------------------------------+
//! ```

pub mod cli;
pub mod cmd;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod ownership;
