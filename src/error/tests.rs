// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{ConfigError, FsError, ProcessError, Result};

#[test]
fn test_config_error_display() {
    let err = ConfigError::InvalidValue {
        section: "process".to_string(),
        key: "poll_interval_ms".to_string(),
        message: "must be greater than zero".to_string(),
    };
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value for 'poll_interval_ms' in section '[process]': must be greater than zero"
    );
}

#[test]
fn test_process_error_wraps_fs_error() {
    let err = ProcessError::from(FsError::NotFound("gen/parser.c".to_string()));
    insta::assert_snapshot!(
        err.to_string(),
        @"failed to materialize file argument: path not found: gen/parser.c"
    );
}

#[test]
fn test_fs_error_from_io_classifies_kind() {
    let missing = FsError::from_io("a", std::io::Error::from(std::io::ErrorKind::NotFound));
    let denied = FsError::from_io(
        "b",
        std::io::Error::from(std::io::ErrorKind::PermissionDenied),
    );
    let other = FsError::from_io("c", std::io::Error::other("disk on fire"));

    assert!(matches!(missing, FsError::NotFound(ref p) if p == "a"));
    assert!(matches!(denied, FsError::PermissionDenied(ref p) if p == "b"));
    assert!(matches!(other, FsError::IoError { ref path, .. } if path == "c"));
}

#[test]
fn test_typed_errors_keep_their_source_under_anyhow_context() {
    fn start() -> Result<()> {
        let err = ProcessError::PipeFailed {
            stream: "stdout",
            source: std::io::Error::from_raw_os_error(24),
        };
        Err(anyhow::Error::new(err).context("failed to start 'cc'"))
    }

    let err = start().unwrap_err();
    assert!(err.downcast_ref::<ProcessError>().is_some());
    let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[..2], ["failed to start 'cc'", "failed to create stdout pipe"]);
}
