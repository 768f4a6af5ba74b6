// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for kiln using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! kiln [global options] <command>
//! version
//! options
//! inis
//! run [--capture MODE] <program> [args...]
//! ```

pub mod global;
pub mod run;

#[cfg(test)]
mod tests;

use crate::cli::global::GlobalOptions;
use crate::cli::run::RunArgs;
use clap::{Parser, Subcommand};

/// Kiln - build tool core
///
/// Runs external build tools as supervised subprocesses.
#[derive(Debug, Parser)]
#[command(
    name = "kiln",
    author,
    version,
    about = "Kiln build tool core",
    long_about = "kiln Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Runs external build tools as supervised subprocesses.\n\n\
                  Invoking `kiln run cc -c main.c` runs the compiler found on PATH.\n\
                  A program containing '/' is executed from that exact path.\n\
                  See `kiln <command> --help` for more information about a command.",
    after_help = "CONFIG FILES:\n\n\
                  kiln loads `kiln.toml` from the current directory if present,\n\
                  then every --ini file in order. KILN_<SECTION>__<KEY> environment\n\
                  variables and --set options override both. Use --no-default-inis\n\
                  to skip `kiln.toml`."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    #[command(visible_alias = "-v")]
    Version,

    /// Lists all options and their values.
    Options,

    /// Lists the config files used by kiln.
    Inis,

    /// Runs a program through the subprocess engine.
    Run(RunArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
