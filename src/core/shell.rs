//! Execution backend for script-backed behaviors.
//!
//! Runs an argv list, optionally with a timeout, and maps a nonzero exit to
//! the configured [`FailHandle`] policy. Empty stdout from a successful
//! command is reported as the [`SUCCESS_SENTINEL`].

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{PrudenceError, Result};

/// Returned instead of stdout when a command succeeded without printing
pub const SUCCESS_SENTINEL: &str = "success";

const POLL_SLICE: Duration = Duration::from_millis(10);

/// What to do when a command exits with a nonzero status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailHandle {
    /// Raise `CommandFailed`
    Fail,
    /// Return nothing, log stderr
    Nag,
    /// Return nothing silently
    #[default]
    Report,
    /// Return stdout regardless of exit code
    Ignore,
}

/// How long to wait for a command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wait {
    Forever,
    For(Duration),
    /// Fire and forget: nothing is captured
    Detach,
}

impl Wait {
    /// `None` waits forever, a negative value detaches
    pub fn from_secs(secs: Option<f64>) -> Result<Self> {
        match secs {
            None => Ok(Wait::Forever),
            Some(s) if s < 0.0 => Ok(Wait::Detach),
            Some(s) => Ok(Wait::For(duration_from_secs(s)?)),
        }
    }
}

/// Seconds to a `Duration`, rejecting NaN, infinity and overflow
pub fn duration_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| PrudenceError::config(format!("invalid duration of {} seconds: {}", secs, e)))
}

/// Wait and failure policy for one kind of invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub wait: Wait,
    pub fail_handle: FailHandle,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            wait: Wait::Forever,
            fail_handle: FailHandle::Report,
        }
    }
}

/// Run `cmd` and communicate with it.
///
/// Returns `Ok(None)` when detached, or when the command failed under the
/// `nag`/`report` policies.
pub fn process_comm(cmd: &[String], opts: RunOptions) -> Result<Option<String>> {
    let (program, args) = cmd
        .split_first()
        .ok_or_else(|| PrudenceError::config("empty command"))?;

    if opts.wait == Wait::Detach {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()?;
        log::debug!("Detached: {:?}", cmd);
        reap(child, cmd.to_vec());
        return Ok(None);
    }

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes so a chatty child never blocks on a full buffer
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let status = match opts.wait {
        Wait::For(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PrudenceError::Timeout {
                        cmd: cmd.to_vec(),
                        seconds: limit.as_secs_f64(),
                    });
                }
                thread::sleep(POLL_SLICE);
            }
        }
        _ => child.wait()?,
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    log::debug!("{:?}", cmd);
    log::debug!("stdout: {}", stdout.trim_end());
    log::debug!("stderr: {}", stderr.trim_end());
    log::debug!("returncode: {:?}", status.code());

    if !status.success() {
        match opts.fail_handle {
            FailHandle::Fail => {
                return Err(PrudenceError::CommandFailed {
                    cmd: cmd.to_vec(),
                    stderr,
                })
            }
            FailHandle::Nag => {
                log::warn!("{}", stderr.trim_end());
                return Ok(None);
            }
            FailHandle::Report => return Ok(None),
            FailHandle::Ignore => {}
        }
    }

    if stdout.trim().is_empty() {
        Ok(Some(SUCCESS_SENTINEL.to_string()))
    } else {
        Ok(Some(stdout))
    }
}

/// Wait for a detached child in the background so it never lingers as a zombie
fn reap(mut child: Child, cmd: Vec<String>) {
    thread::spawn(move || match child.wait() {
        Ok(status) => log::debug!("Detached {:?} exited: {:?}", cmd, status.code()),
        Err(e) => log::debug!("Detached {:?} could not be waited on: {}", cmd, e),
    });
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}
