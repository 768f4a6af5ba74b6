// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for the subprocess engine.
//!
//! Runs real children through `ChildReaper` and checks the completion join,
//! executable resolution and forced teardown.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use kiln::core::events::{ChildReaper, ProcessExit};
use kiln::core::file::{DiskFile, DiskRef, FileUsage, VirtualFile};
use kiln::core::process::{ExecutableLookup, ProcessState, Subprocess, drain_pipe};
use kiln::error::FsError;
use kiln::ownership::Owned;
use nix::errno::Errno;
use nix::sys::signal::kill;

const INTERVAL: Duration = Duration::from_millis(10);

type Seen = Rc<RefCell<Vec<ProcessExit>>>;

fn start(process: &mut Subprocess, reaper: &ChildReaper) -> Seen {
    let seen: Seen = Rc::new(RefCell::new(Vec::new()));
    let slot = Rc::clone(&seen);
    process
        .start(reaper, move |exit| slot.borrow_mut().push(exit))
        .unwrap();
    seen
}

fn sh(script: &str) -> Subprocess {
    let mut process = Subprocess::new();
    process.add_argument("sh");
    process.add_argument("-c");
    process.add_argument(script);
    process
}

/// Runs `process` with stderr captured and returns its exit and stderr text.
async fn run_capturing_stderr(mut process: Subprocess) -> (ProcessExit, String) {
    let reaper = ChildReaper::new();
    let stderr = process.capture_stderr().unwrap();
    let seen = start(&mut process, &reaper);

    reaper.run(INTERVAL).await.unwrap();
    let text = drain_pipe(stderr, "test", "stderr").unwrap();
    process.pipe_done();

    let exits = seen.borrow().clone();
    assert_eq!(exits.len(), 1, "completion must fire exactly once");
    (exits[0], text)
}

// =============================================================================
// Completion join
// =============================================================================

#[tokio::test]
async fn completion_after_pipes_then_exit() {
    let reaper = ChildReaper::new();
    let mut process = sh("echo out; echo err >&2; exec 1>&- 2>&-; sleep 0.2; exit 5");
    let stdout = process.capture_stdout().unwrap();
    let stderr = process.capture_stderr().unwrap();
    let seen = start(&mut process, &reaper);

    assert_eq!(drain_pipe(stdout, "sh", "stdout").unwrap(), "out\n");
    process.pipe_done();
    assert_eq!(drain_pipe(stderr, "sh", "stderr").unwrap(), "err\n");
    process.pipe_done();

    // Both streams are closed but the shell is still sleeping.
    assert!(seen.borrow().is_empty());
    assert_eq!(process.state(), ProcessState::Running);

    reaper.run(INTERVAL).await.unwrap();
    assert_eq!(*seen.borrow(), vec![ProcessExit::Exited(5)]);
}

#[tokio::test]
async fn completion_after_exit_then_pipes() {
    let reaper = ChildReaper::new();
    // The background subshell keeps both streams open after the shell exits.
    let mut process = sh("(sleep 0.3; echo late) & exit 2");
    let stdout = process.capture_stdout().unwrap();
    let stderr = process.capture_stderr().unwrap();
    let seen = start(&mut process, &reaper);

    reaper.run(INTERVAL).await.unwrap();
    assert_eq!(process.state(), ProcessState::Exited(2));
    assert_eq!(process.pending_pipes(), 2);
    assert!(seen.borrow().is_empty());

    assert_eq!(drain_pipe(stdout, "sh", "stdout").unwrap(), "late\n");
    process.pipe_done();
    assert!(seen.borrow().is_empty());

    assert_eq!(drain_pipe(stderr, "sh", "stderr").unwrap(), "");
    process.pipe_done();
    assert_eq!(*seen.borrow(), vec![ProcessExit::Exited(2)]);
}

#[tokio::test]
async fn completion_without_capture_fires_on_exit() {
    let reaper = ChildReaper::new();
    let mut process = sh("exit 0");
    let seen = start(&mut process, &reaper);

    reaper.run(INTERVAL).await.unwrap();
    assert_eq!(*seen.borrow(), vec![ProcessExit::Exited(0)]);
    assert_eq!(process.pid(), None);
}

#[tokio::test]
async fn signaled_child_is_reported() {
    let (exit, _) = run_capturing_stderr(sh("kill -TERM $$")).await;
    assert_eq!(exit, ProcessExit::Signaled(15));
}

// =============================================================================
// Executable resolution
// =============================================================================

#[tokio::test]
async fn literal_program_is_searched_on_path() {
    let mut process = Subprocess::new();
    process.add_argument("true");
    assert_eq!(process.lookup(), ExecutableLookup::SearchPath);

    let (exit, stderr) = run_capturing_stderr(process).await;
    assert_eq!(exit, ProcessExit::Exited(0));
    assert_eq!(stderr, "");
}

#[tokio::test]
async fn file_program_is_executed_by_exact_path() {
    let mut process = Subprocess::new();
    process
        .add_file_argument(&DiskFile::new("/bin/sh"), FileUsage::Read)
        .unwrap();
    process.add_argument("-c");
    process.add_argument("exit 7");
    assert_eq!(process.lookup(), ExecutableLookup::Exact);

    let (exit, _) = run_capturing_stderr(process).await;
    assert_eq!(exit, ProcessExit::Exited(7));
}

#[tokio::test]
async fn missing_program_exits_non_zero() {
    let mut process = Subprocess::new();
    process.add_argument("kiln-test-no-such-program");

    let (exit, stderr) = run_capturing_stderr(process).await;
    assert_eq!(exit, ProcessExit::Exited(1));
    assert!(stderr.starts_with("exec: "), "unexpected stderr: {stderr:?}");
}

#[tokio::test]
async fn unexecutable_file_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("build.sh");
    std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();

    let mut process = Subprocess::new();
    process
        .add_file_argument(&DiskFile::new(&script), FileUsage::Read)
        .unwrap();

    let (exit, stderr) = run_capturing_stderr(process).await;
    assert_eq!(exit, ProcessExit::Exited(1));
    assert!(stderr.starts_with("exec: "), "unexpected stderr: {stderr:?}");
}

// =============================================================================
// Pinned files and teardown
// =============================================================================

#[derive(Debug)]
struct TrackedRef {
    path: PathBuf,
    released: Rc<RefCell<bool>>,
}

impl DiskRef for TrackedRef {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TrackedRef {
    fn drop(&mut self) {
        *self.released.borrow_mut() = true;
    }
}

struct TrackedFile {
    path: PathBuf,
    released: Rc<RefCell<bool>>,
}

impl VirtualFile for TrackedFile {
    fn materialize(&self, _usage: FileUsage) -> Result<Owned<dyn DiskRef>, FsError> {
        Ok(Owned::from_box(Box::new(TrackedRef {
            path: self.path.clone(),
            released: Rc::clone(&self.released),
        })))
    }
}

#[tokio::test]
async fn pinned_file_is_released_at_exit() {
    let released = Rc::new(RefCell::new(false));
    let reaper = ChildReaper::new();

    let mut process = Subprocess::new();
    process.add_argument("cat");
    process
        .add_file_argument(
            &TrackedFile {
                path: PathBuf::from("/dev/null"),
                released: Rc::clone(&released),
            },
            FileUsage::Read,
        )
        .unwrap();
    let _seen = start(&mut process, &reaper);
    assert!(!*released.borrow());

    reaper.run(INTERVAL).await.unwrap();
    assert!(*released.borrow());
    // The subprocess itself is still alive.
    assert_eq!(process.state(), ProcessState::Exited(0));
}

#[tokio::test]
async fn dropping_running_subprocess_kills_and_reaps() {
    let reaper = ChildReaper::new();
    let mut process = Subprocess::new();
    process.add_argument("sleep");
    process.add_argument("30");
    let combined = process.capture_stdout_and_stderr().unwrap();
    let seen = start(&mut process, &reaper);

    let pid = process.pid().unwrap();
    assert_eq!(reaper.pending(), 1);
    drop(process);

    // Killed and reaped: not even a zombie is left.
    assert_eq!(kill(pid, None), Err(Errno::ESRCH));
    assert_eq!(drain_pipe(combined, "sleep", "combined").unwrap(), "");

    // The cancelled watch is discarded without delivering anything.
    reaper.run(INTERVAL).await.unwrap();
    assert!(reaper.is_idle());
    assert!(seen.borrow().is_empty());
}

type Slot = Rc<RefCell<Option<Subprocess>>>;

/// Starts `process` with a callback that drops `sibling`, first recording
/// whether the sibling's pid still names an unreaped child.
fn start_dropping_sibling(
    process: &mut Subprocess,
    reaper: &ChildReaper,
    sibling: &Slot,
    live_pids: &Rc<RefCell<Vec<bool>>>,
) {
    let sibling = Rc::clone(sibling);
    let live_pids = Rc::clone(live_pids);
    process
        .start(reaper, move |_| {
            let Some(sibling) = sibling.borrow_mut().take() else {
                return;
            };
            if let Some(pid) = sibling.pid() {
                live_pids.borrow_mut().push(kill(pid, None).is_ok());
            }
            drop(sibling);
        })
        .unwrap();
}

#[test]
fn callback_dropping_an_exited_sibling_only_signals_unreaped_pids() {
    let reaper = ChildReaper::new();
    let first: Slot = Rc::new(RefCell::new(None));
    let second: Slot = Rc::new(RefCell::new(None));
    let live_pids = Rc::new(RefCell::new(Vec::new()));

    let mut a = sh("exit 0");
    let mut b = sh("exit 0");
    start_dropping_sibling(&mut a, &reaper, &second, &live_pids);
    start_dropping_sibling(&mut b, &reaper, &first, &live_pids);
    *first.borrow_mut() = Some(a);
    *second.borrow_mut() = Some(b);

    // Let both children exit before the reaper looks at either.
    std::thread::sleep(Duration::from_millis(300));

    // Whichever exit is delivered first drops the other subprocess, which
    // must still own its (unreaped) pid.
    assert_eq!(reaper.poll(), 1);
    assert_eq!(*live_pids.borrow(), vec![true]);
    assert!(reaper.is_idle());

    first.borrow_mut().take();
    second.borrow_mut().take();
}
