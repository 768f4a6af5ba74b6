// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Run command implementation.
//!
//! ```text
//! RunArgs
//!   program has '/' ? add_file_argument(DiskFile) : add_argument
//!   capture pipes per CaptureMode
//!   start(&ChildReaper)
//!   join!(reaper.run, drain stdout -> pipe_done, drain stderr -> pipe_done)
//!   echo captured text, exit status --> ExitCode
//! ```

use std::cell::Cell;
use std::os::fd::OwnedFd;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, bail};
use tracing::{debug, info, warn};

use crate::cli::run::{CaptureMode, RunArgs};
use crate::config::Config;
use crate::core::events::{ChildReaper, ProcessExit};
use crate::core::file::{DiskFile, FileUsage};
use crate::core::process::{Subprocess, drain_pipe_async};
use crate::error::Result;

/// A captured stream and where its text is echoed.
struct Capture {
    read_end: OwnedFd,
    stream: &'static str,
    to_stderr: bool,
}

/// Main handler for run command.
///
/// Returns the exit code to report: the child's own status, or 128 plus the
/// signal number if it was killed.
///
/// # Errors
///
/// Returns an error if the program cannot be started or its output cannot be
/// read.
pub async fn run_run_command(args: &RunArgs, config: &Config) -> Result<ExitCode> {
    let program = args.program();
    if program.is_empty() {
        bail!("no program given");
    }
    let reaper = ChildReaper::new();
    let mut process = build_subprocess(program, args.program_args())?;
    let [first, second] = open_captures(&mut process, args.capture)?;

    let outcome = Rc::new(Cell::new(None));
    let slot = Rc::clone(&outcome);
    info!(command = %process.command_line(), "running");
    process
        .start(&reaper, move |exit| slot.set(Some(exit)))
        .with_context(|| format!("failed to start '{program}'"))?;

    let (reaped, first, second) = tokio::join!(
        reaper.run(config.process.poll_interval()),
        drain(&process, first, program),
        drain(&process, second, program),
    );
    reaped.context("failed to watch child process")?;

    for (text, to_stderr) in [first?, second?].into_iter().flatten() {
        if to_stderr {
            eprint!("{text}");
        } else {
            print!("{text}");
        }
    }

    let Some(exit) = outcome.get() else {
        bail!("'{program}' did not complete");
    };
    if exit.success() {
        debug!(%exit, "command finished");
    } else {
        warn!(%exit, command = %process.command_line(), "command failed");
    }
    Ok(exit_code(exit))
}

fn build_subprocess(program: &str, program_args: &[String]) -> Result<Subprocess> {
    let mut process = Subprocess::new();
    if program.contains('/') {
        process
            .add_file_argument(&DiskFile::new(program), FileUsage::Read)
            .with_context(|| format!("cannot run '{program}'"))?;
    } else {
        process.add_argument(program);
    }
    for arg in program_args {
        process.add_argument(arg);
    }
    Ok(process)
}

fn open_captures(process: &mut Subprocess, mode: CaptureMode) -> Result<[Option<Capture>; 2]> {
    let capture = |read_end, stream, to_stderr| {
        Some(Capture {
            read_end,
            stream,
            to_stderr,
        })
    };
    Ok(match mode {
        CaptureMode::None => [None, None],
        CaptureMode::Stdout => [capture(process.capture_stdout()?, "stdout", false), None],
        CaptureMode::Stderr => [capture(process.capture_stderr()?, "stderr", true), None],
        CaptureMode::Split => [
            capture(process.capture_stdout()?, "stdout", false),
            capture(process.capture_stderr()?, "stderr", true),
        ],
        CaptureMode::Combined => [
            capture(process.capture_stdout_and_stderr()?, "combined", false),
            None,
        ],
    })
}

async fn drain(
    process: &Subprocess,
    capture: Option<Capture>,
    program: &str,
) -> Result<Option<(String, bool)>> {
    let Some(capture) = capture else {
        return Ok(None);
    };
    let text = drain_pipe_async(capture.read_end, program.to_string(), capture.stream).await;
    process.pipe_done();
    let text = text.with_context(|| format!("failed to read {} of '{program}'", capture.stream))?;
    Ok(Some((text, capture.to_stderr)))
}

/// Maps an exit outcome to the status reported by the tool.
#[must_use]
pub fn exit_code(exit: ProcessExit) -> ExitCode {
    let code = match exit {
        ProcessExit::Exited(code) => u8::try_from(code).unwrap_or(1),
        ProcessExit::Signaled(signo) => u8::try_from(128 + signo).unwrap_or(u8::MAX),
    };
    ExitCode::from(code)
}
