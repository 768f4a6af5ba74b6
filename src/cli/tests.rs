// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::cli::global::GlobalOptions;
use crate::cli::run::CaptureMode;
use crate::cli::{Cli, Command};
use clap::Parser;

#[test]
fn test_parse_version() {
    let cli = Cli::try_parse_from(["kiln", "version"]).unwrap();
    insta::assert_debug_snapshot!(cli.command, @r"
    Some(
        Version,
    )
    ");
}

#[test]
fn test_parse_run_passes_hyphen_arguments_through() {
    let cli = Cli::try_parse_from(["kiln", "run", "cc", "-c", "main.c", "-o", "main.o"]).unwrap();
    let Some(Command::Run(args)) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.capture, CaptureMode::Split);
    assert_eq!(args.program(), "cc");
    assert_eq!(args.program_args(), ["-c", "main.c", "-o", "main.o"]);
}

#[test]
fn test_parse_run_child_help_flag_is_not_ours() {
    let cli = Cli::try_parse_from(["kiln", "run", "-c", "stdout", "make", "--help", "-v"]).unwrap();
    let Some(Command::Run(args)) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.capture, CaptureMode::Stdout);
    assert_eq!(args.command, ["make", "--help", "-v"]);
}

#[test]
fn test_parse_run_capture_mode() {
    let cli = Cli::try_parse_from(["kiln", "run", "--capture", "combined", "./build.sh"]).unwrap();
    let Some(Command::Run(args)) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.capture, CaptureMode::Combined);
    assert_eq!(args.program(), "./build.sh");
    assert!(args.program_args().is_empty());
}

#[test]
fn test_parse_rejects_log_level_out_of_range() {
    assert!(Cli::try_parse_from(["kiln", "-l", "6", "version"]).is_err());
}

#[test]
fn test_global_options_to_overrides() {
    let cli = Cli::try_parse_from([
        "kiln",
        "-l",
        "4",
        "--log-file",
        "logs/kiln.log",
        "-s",
        "process/poll_interval_ms=10",
        "options",
    ])
    .unwrap();
    let overrides = cli.global.to_config_overrides().unwrap();
    insta::assert_debug_snapshot!(overrides, @r#"
    [
        (
            "process.poll_interval_ms",
            "10",
        ),
        (
            "global.output_log_level",
            "4",
        ),
        (
            "global.file_log_level",
            "4",
        ),
        (
            "global.log_file",
            "logs/kiln.log",
        ),
    ]
    "#);
}

#[test]
fn test_set_without_value_is_rejected() {
    let global = GlobalOptions {
        options: vec!["process.poll_interval_ms".to_string()],
        ..GlobalOptions::default()
    };
    let err = global.to_config_overrides().unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"failed to parse config '--set': expected KEY=VALUE, got 'process.poll_interval_ms'"
    );
}
