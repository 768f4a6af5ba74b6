// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::cell::{Cell, RefCell};
use std::ffi::{CStr, OsString};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use tokio_util::sync::CancellationToken;

use super::child::ExecPlan;
use super::{ExecutableLookup, ProcessState, Subprocess, drain_pipe};
use crate::core::events::{ExitCallback, ExitScheduler, ProcessExit};
use crate::core::file::{DiskRef, FileUsage, VirtualFile};
use crate::error::{FsError, ProcessError};
use crate::ownership::Owned;

/// Scheduler whose exit notifications are delivered by the test.
#[derive(Default)]
struct ManualScheduler {
    watches: RefCell<Vec<(Pid, ExitCallback, CancellationToken)>>,
}

impl ExitScheduler for ManualScheduler {
    fn on_process_exit(&self, pid: Pid, callback: ExitCallback) -> CancellationToken {
        let token = CancellationToken::new();
        self.watches
            .borrow_mut()
            .push((pid, callback, token.clone()));
        token
    }
}

impl ManualScheduler {
    fn watched(&self) -> usize {
        self.watches.borrow().len()
    }

    fn token(&self) -> CancellationToken {
        self.watches.borrow()[0].2.clone()
    }

    fn pid(&self) -> Pid {
        self.watches.borrow()[0].0
    }

    /// Blocks until the watched child exits, then delivers its status.
    fn reap_and_deliver(&self) {
        let (pid, callback, token) = self.watches.borrow_mut().remove(0);
        let exit = match waitpid(pid, None).unwrap() {
            WaitStatus::Exited(_, code) => ProcessExit::Exited(code),
            WaitStatus::Signaled(_, signal, _) => ProcessExit::Signaled(signal as i32),
            other => panic!("unexpected wait status {other:?}"),
        };
        if !token.is_cancelled() {
            (callback.into_box().unwrap())(exit);
        }
    }
}

fn completion_slot() -> (Rc<RefCell<Vec<ProcessExit>>>, impl FnOnce(ProcessExit) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let slot = Rc::clone(&seen);
    (seen, move |exit| slot.borrow_mut().push(exit))
}

fn sh(script: &str) -> Subprocess {
    let mut process = Subprocess::new();
    process.add_argument("sh");
    process.add_argument("-c");
    process.add_argument(script);
    process
}

#[derive(Debug)]
struct LoggedRef {
    path: PathBuf,
    log: Rc<RefCell<Vec<String>>>,
}

impl DiskRef for LoggedRef {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LoggedRef {
    fn drop(&mut self) {
        self.log
            .borrow_mut()
            .push(format!("released {}", self.path.display()));
    }
}

struct LoggedFile {
    path: PathBuf,
    log: Rc<RefCell<Vec<String>>>,
}

impl VirtualFile for LoggedFile {
    fn materialize(&self, usage: FileUsage) -> Result<Owned<dyn DiskRef>, FsError> {
        self.log
            .borrow_mut()
            .push(format!("pinned {} for {usage:?}", self.path.display()));
        Ok(Owned::from_box(Box::new(LoggedRef {
            path: self.path.clone(),
            log: Rc::clone(&self.log),
        })))
    }
}

struct MissingFile;

impl VirtualFile for MissingFile {
    fn materialize(&self, _usage: FileUsage) -> Result<Owned<dyn DiskRef>, FsError> {
        Err(FsError::NotFound("gen/missing.h".to_string()))
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_first_argument_selects_lookup() {
    let mut literal = Subprocess::new();
    literal.add_argument("cc");
    assert_eq!(literal.lookup(), ExecutableLookup::SearchPath);

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut exact = Subprocess::new();
    exact
        .add_file_argument(
            &LoggedFile {
                path: PathBuf::from("/usr/bin/cc"),
                log: Rc::clone(&log),
            },
            FileUsage::Read,
        )
        .unwrap();
    exact.add_argument("-c");
    assert_eq!(exact.lookup(), ExecutableLookup::Exact);
    assert_eq!(exact.command_line(), "/usr/bin/cc -c");

    // Later file arguments do not change the lookup mode.
    literal
        .add_file_argument(
            &LoggedFile {
                path: PathBuf::from("main.c"),
                log: Rc::clone(&log),
            },
            FileUsage::Read,
        )
        .unwrap();
    assert_eq!(literal.lookup(), ExecutableLookup::SearchPath);

    drop(exact);
    drop(literal);
    insta::assert_debug_snapshot!(log.borrow(), @r#"
    [
        "pinned /usr/bin/cc for Read",
        "pinned main.c for Read",
        "released /usr/bin/cc",
        "released main.c",
    ]
    "#);
}

#[test]
fn test_failed_materialize_is_reported() {
    let mut process = Subprocess::new();
    process.add_argument("cc");
    let err = process
        .add_file_argument(&MissingFile, FileUsage::Read)
        .unwrap_err();
    assert!(matches!(err, ProcessError::Materialize(FsError::NotFound(_))));
    assert_eq!(process.command_line(), "cc");
}

#[test]
fn test_start_without_arguments_registers_nothing() {
    let scheduler = ManualScheduler::default();
    let mut process = Subprocess::new();
    let err = process.start(&scheduler, |_| {}).unwrap_err();
    assert!(matches!(err, ProcessError::NoProgram));
    assert_eq!(scheduler.watched(), 0);
    assert_eq!(process.state(), ProcessState::NotStarted);
}

#[test]
fn test_start_rejects_nul_byte() {
    let scheduler = ManualScheduler::default();
    let mut process = Subprocess::new();
    process.add_argument("echo");
    process.add_argument("a\0b");
    let err = process.start(&scheduler, |_| {}).unwrap_err();
    assert!(matches!(err, ProcessError::InvalidArgument { index: 1 }));
    assert_eq!(scheduler.watched(), 0);
}

#[test]
fn test_combined_capture_replaces_individual_streams() {
    let scheduler = ManualScheduler::default();
    let mut process = sh("echo out; echo err >&2");
    let stdout = process.capture_stdout().unwrap();
    let stderr = process.capture_stderr().unwrap();
    let combined = process.capture_stdout_and_stderr().unwrap();
    process.start(&scheduler, |_| {}).unwrap();

    assert_eq!(process.pending_pipes(), 1);
    // Write ends of the replaced pipes were closed before the fork.
    assert_eq!(drain_pipe(stdout, "sh", "stdout").unwrap(), "");
    assert_eq!(drain_pipe(stderr, "sh", "stderr").unwrap(), "");

    let text = drain_pipe(combined, "sh", "combined").unwrap();
    assert!(text.contains("out\n"));
    assert!(text.contains("err\n"));

    process.pipe_done();
    scheduler.reap_and_deliver();
    assert_eq!(process.state(), ProcessState::Exited(0));
}

#[test]
fn test_individual_capture_cancels_combined() {
    let scheduler = ManualScheduler::default();
    let mut process = sh("echo out");
    let _combined = process.capture_stdout_and_stderr().unwrap();
    let stdout = process.capture_stdout().unwrap();
    process.start(&scheduler, |_| {}).unwrap();

    assert_eq!(process.pending_pipes(), 1);
    assert_eq!(drain_pipe(stdout, "sh", "stdout").unwrap(), "out\n");
    process.pipe_done();
    scheduler.reap_and_deliver();
}

// =============================================================================
// Completion join
// =============================================================================

#[test]
fn test_completion_waits_for_exit_after_pipes() {
    let scheduler = ManualScheduler::default();
    let (seen, callback) = completion_slot();

    let mut process = sh("echo out; echo err >&2; exit 4");
    let stdout = process.capture_stdout().unwrap();
    let stderr = process.capture_stderr().unwrap();
    process.start(&scheduler, callback).unwrap();
    assert_eq!(process.state(), ProcessState::Running);
    assert!(process.pid().is_some());
    assert_eq!(process.pending_pipes(), 2);

    assert_eq!(drain_pipe(stdout, "sh", "stdout").unwrap(), "out\n");
    process.pipe_done();
    assert_eq!(drain_pipe(stderr, "sh", "stderr").unwrap(), "err\n");
    process.pipe_done();
    assert!(seen.borrow().is_empty());

    scheduler.reap_and_deliver();
    assert_eq!(*seen.borrow(), vec![ProcessExit::Exited(4)]);
    assert_eq!(process.state(), ProcessState::Exited(4));
    assert_eq!(process.pid(), None);
}

#[test]
fn test_completion_waits_for_pipes_after_exit() {
    let scheduler = ManualScheduler::default();
    let (seen, callback) = completion_slot();

    let mut process = sh("echo out; echo err >&2");
    let stdout = process.capture_stdout().unwrap();
    let stderr = process.capture_stderr().unwrap();
    process.start(&scheduler, callback).unwrap();

    scheduler.reap_and_deliver();
    assert_eq!(process.state(), ProcessState::Exited(0));
    assert!(seen.borrow().is_empty());

    drain_pipe(stdout, "sh", "stdout").unwrap();
    process.pipe_done();
    assert!(seen.borrow().is_empty());

    drain_pipe(stderr, "sh", "stderr").unwrap();
    process.pipe_done();
    assert_eq!(*seen.borrow(), vec![ProcessExit::Exited(0)]);
}

#[test]
fn test_exit_releases_pinned_files_before_completion() {
    let scheduler = ManualScheduler::default();
    let log = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));

    let mut process = Subprocess::new();
    process.add_argument("cat");
    process
        .add_file_argument(
            &LoggedFile {
                path: PathBuf::from("/dev/null"),
                log: Rc::clone(&log),
            },
            FileUsage::Read,
        )
        .unwrap();
    let stdout = process.capture_stdout().unwrap();
    let flag = Rc::clone(&completed);
    process.start(&scheduler, move |_| flag.set(true)).unwrap();

    scheduler.reap_and_deliver();
    assert_eq!(log.borrow().last().unwrap(), "released /dev/null");
    assert!(!completed.get());

    drain_pipe(stdout, "cat", "stdout").unwrap();
    process.pipe_done();
    assert!(completed.get());
}

#[test]
#[should_panic(expected = "pipe_done without a pending pipe")]
fn test_pipe_done_without_pending_pipe_panics() {
    let process = Subprocess::new();
    process.pipe_done();
}

#[test]
#[should_panic(expected = "subprocess started twice")]
fn test_start_twice_panics() {
    let scheduler = ManualScheduler::default();
    let mut process = Subprocess::new();
    process.add_argument("true");
    process.start(&scheduler, |_| {}).unwrap();
    scheduler.reap_and_deliver();
    let _ = process.start(&scheduler, |_| {});
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn test_drop_while_running_kills_and_reaps() {
    let scheduler = ManualScheduler::default();
    let completed = Rc::new(Cell::new(false));

    let mut process = Subprocess::new();
    process.add_argument("sleep");
    process.add_argument("30");
    let combined = process.capture_stdout_and_stderr().unwrap();
    let flag = Rc::clone(&completed);
    process.start(&scheduler, move |_| flag.set(true)).unwrap();

    let pid = scheduler.pid();
    let token = scheduler.token();
    drop(process);

    assert!(token.is_cancelled());
    assert_eq!(kill(pid, None), Err(Errno::ESRCH));
    assert_eq!(drain_pipe(combined, "sleep", "combined").unwrap(), "");
    assert!(!completed.get());
}

#[test]
fn test_drop_after_exit_does_not_kill() {
    let scheduler = ManualScheduler::default();
    let mut process = Subprocess::new();
    process.add_argument("true");
    process.start(&scheduler, |_| {}).unwrap();
    let token = scheduler.token();

    scheduler.reap_and_deliver();
    drop(process);
    assert!(!token.is_cancelled());
}

#[test]
fn test_subprocess_debug() {
    let process = sh("exit 0");
    insta::assert_snapshot!(
        format!("{process:?}"),
        @r#"Subprocess { command: "sh -c exit 0", lookup: SearchPath, state: NotStarted, pending_pipes: 0, .. }"#
    );
}

#[test]
fn test_exec_plan_prepares_null_terminated_argv_before_fork() {
    let args = [OsString::from("cc"), OsString::from("-c"), OsString::from("main.c")];
    let plan = ExecPlan::new(&args, ExecutableLookup::SearchPath).unwrap();

    let ptrs = plan.argv_ptrs();
    assert_eq!(ptrs.len(), args.len() + 1);
    assert!(ptrs[args.len()].is_null());
    let strings: Vec<&[u8]> = ptrs[..args.len()]
        .iter()
        // SAFETY: every entry before the terminator points into the plan.
        .map(|&ptr| unsafe { CStr::from_ptr(ptr) }.to_bytes())
        .collect();
    assert_eq!(
        strings,
        [b"cc".as_slice(), b"-c".as_slice(), b"main.c".as_slice()]
    );
}
