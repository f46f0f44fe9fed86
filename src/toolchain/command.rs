// src/toolchain/command.rs

//! Running toolchain child processes with timeout and cancellation

use crate::error::{Error, Result};
use crate::recipe::kitchen::CancelToken;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// How often a running step checks for cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lines of stderr quoted in a failure message
const ERROR_TAIL_LINES: usize = 20;

/// Run one toolchain step and return its combined output
///
/// The child is killed when `cancel` fires (`Error::Cancelled`) or when
/// it outlives `timeout` (`Error::BuildFailure`).
pub fn run_step(
    mut command: Command,
    step: &str,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<String> {
    debug!("[{}] {:?}", step, command);

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::BuildFailure(format!("Failed to spawn {} step: {}", step, e)))?;

    // Drain pipes on their own threads so a chatty child cannot block
    let stdout_reader = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    });
    let stderr_reader = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
            break status;
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            warn!("[{}] cancelled", step);
            return Err(Error::Cancelled);
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::BuildFailure(format!(
                "{} step timed out after {} seconds",
                step,
                timeout.as_secs()
            )));
        }
    };

    let stdout = stdout_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    for line in stdout.lines() {
        debug!("[{}] {}", step, line);
    }
    for line in stderr.lines() {
        debug!("[{}] stderr: {}", step, line);
    }

    if !status.success() {
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(ERROR_TAIL_LINES)..].join("\n");
        return Err(Error::BuildFailure(format!(
            "{} step failed with exit code {}{}",
            step,
            status.code().unwrap_or(-1),
            if tail.is_empty() {
                String::new()
            } else {
                format!(":\n{}", tail)
            }
        )));
    }

    let mut output = stdout;
    if !stderr.is_empty() {
        output.push_str(&stderr);
    }
    Ok(output)
}
