// kiln: Dependency-Driven Build Tool Core
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Draining captured output.
//!
//! ```text
//! read end (OwnedFd)
//!   BufReader::read_until('\n')
//!     lossy UTF-8 --> trace!(process, stream, line)
//!                 --> appended to the returned text
//!   EOF --> caller reports Subprocess::pipe_done()
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::os::fd::OwnedFd;

use tracing::trace;

/// Reads `read_end` to end of file, logging each line at TRACE.
///
/// Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
///
/// Returns any I/O error raised while reading.
pub fn drain_pipe(read_end: OwnedFd, process: &str, stream: &str) -> io::Result<String> {
    let mut reader = BufReader::new(File::from(read_end));
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        trace!(
            process = process,
            stream = stream,
            line = line.trim_end_matches(['\r', '\n']),
            "output"
        );
        text.push_str(&line);
    }
    Ok(text)
}

/// [`drain_pipe`] on the blocking thread pool.
///
/// # Errors
///
/// Returns any I/O error raised while reading, or an error if the blocking
/// task panicked.
pub async fn drain_pipe_async(
    read_end: OwnedFd,
    process: String,
    stream: &'static str,
) -> io::Result<String> {
    tokio::task::spawn_blocking(move || drain_pipe(read_end, &process, stream))
        .await
        .map_err(io::Error::other)?
}
