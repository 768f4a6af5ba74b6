// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run command arguments.

use clap::{Args, ValueEnum};

/// Which of the child's output streams are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CaptureMode {
    /// Inherit the terminal.
    None,
    /// Capture stdout only.
    Stdout,
    /// Capture stderr only.
    Stderr,
    /// Capture stdout and stderr through separate pipes.
    #[default]
    Split,
    /// Capture stdout and stderr interleaved through one pipe.
    Combined,
}

/// Runs a program through the subprocess engine.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Output streams to capture and echo.
    #[arg(short = 'c', long, value_enum, default_value_t = CaptureMode::Split)]
    pub capture: CaptureMode,

    /// Program to run followed by its arguments.
    ///
    /// Looked up on PATH unless it contains '/'. Nothing after the program is
    /// parsed as a kiln option.
    #[arg(
        value_name = "PROGRAM",
        num_args = 1..,
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Program name; empty if no command was given.
    #[must_use]
    pub fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn program_args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}
