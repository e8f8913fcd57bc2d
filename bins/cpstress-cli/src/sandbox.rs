/// Process Sandbox Runner - Candidate Execution
///
/// **Core Responsibility:**
/// Run one candidate process against one input and report what happened.
///
/// **Critical Architectural Boundary:**
/// - The sandbox knows HOW to spawn, feed, drain, time, and reap a process
/// - It does NOT know verdicts, problems, or persistence
/// - It returns a classified outcome for the controller to judge
///
/// The input is written from a dedicated thread while stdout and stderr are
/// drained on their own threads, so neither side can stall on a full pipe:
/// a candidate that writes megabytes before reading, or never reads at all,
/// still completes.
///
/// The only platform-variant code is resource accounting: on unix the child
/// is reaped with `wait4` and `ru_maxrss` is normalized to bytes in
/// `maxrss_to_bytes`. Elsewhere peak memory reads as zero.

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use cpstress_common::types::ResourceUsage;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How the candidate process finished, with everything the controller needs
/// to assign a verdict.
#[derive(Debug)]
pub enum RunOutcome {
    /// Normal exit with status 0.
    Completed {
        stdout: String,
        stderr: String,
        usage: ResourceUsage,
    },
    /// Nonzero exit or death by signal, including a forced kill at the
    /// wall-clock deadline. Partial output is preserved.
    Crashed {
        stdout: String,
        stderr: String,
        status: ProcessStatus,
        timed_out: bool,
        usage: ResourceUsage,
    },
    /// The process could not be started at all: missing executable, missing
    /// permissions, pipe setup failure. A harness/environment problem, not
    /// a candidate bug.
    SpawnFailed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Exited(i32),
    Signaled(i32),
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Exited(code) => write!(f, "exit code {code}"),
            ProcessStatus::Signaled(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Run `executable` with `input` on its stdin, under a wall-clock deadline.
///
/// Blocking process management is bridged off the runtime; exactly one
/// candidate is in flight at a time.
pub async fn run(executable: &Path, input: &str, time_limit: Duration) -> RunOutcome {
    let executable = executable.to_path_buf();
    let input = input.to_owned();
    match tokio::task::spawn_blocking(move || run_blocking(&executable, &input, time_limit)).await {
        Ok(outcome) => outcome,
        Err(join_error) => RunOutcome::SpawnFailed {
            reason: format!("sandbox task failed: {join_error}"),
        },
    }
}

fn run_blocking(executable: &Path, input: &str, time_limit: Duration) -> RunOutcome {
    let started = Instant::now();
    let spawned = Command::new(executable)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let mut guard = match spawned {
        Ok(child) => ChildGuard::new(child),
        Err(error) => {
            return RunOutcome::SpawnFailed {
                reason: format!("failed to start {}: {error}", executable.display()),
            }
        }
    };

    let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) = (
        guard.child.stdin.take(),
        guard.child.stdout.take(),
        guard.child.stderr.take(),
    ) else {
        return RunOutcome::SpawnFailed {
            reason: "child stdio was not piped".to_string(),
        };
    };

    // A broken pipe here means the child exited before consuming its input;
    // the exit status classifies that case, so the write error is dropped.
    // The thread drops stdin when done, which is the EOF the child waits on.
    let input_bytes = input.as_bytes().to_vec();
    let writer = thread::spawn(move || {
        let _ = stdin.write_all(&input_bytes);
    });
    let stdout_thread = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });
    let stderr_thread = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    });

    let waited = wait_with_usage(&mut guard, started + time_limit);
    let elapsed = started.elapsed();

    // If waiting itself failed, make sure the child is dead before joining
    // the I/O threads, which only finish once the pipes close.
    if waited.is_err() {
        let _ = guard.child.kill();
    }

    let _ = writer.join();
    let stdout = String::from_utf8_lossy(&stdout_thread.join().unwrap_or_default()).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_thread.join().unwrap_or_default()).into_owned();

    let (status, peak_memory_bytes, timed_out) = match waited {
        Ok(reaped) => reaped,
        Err(error) => {
            return RunOutcome::SpawnFailed {
                reason: format!("failed waiting for candidate: {error}"),
            }
        }
    };

    let usage = ResourceUsage {
        elapsed,
        peak_memory_bytes,
    };
    debug!(
        elapsed_ms = usage.time_ms(),
        peak_memory_bytes,
        status = %status,
        timed_out,
        "candidate finished"
    );

    match status {
        ProcessStatus::Exited(0) => RunOutcome::Completed {
            stdout,
            stderr,
            usage,
        },
        status => RunOutcome::Crashed {
            stdout,
            stderr,
            status,
            timed_out,
            usage,
        },
    }
}

/// Kills and reaps the child on drop unless it was already reaped, so no
/// exit path leaks a zombie or an open pipe.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Poll for exit until `deadline`, then kill and reap.
///
/// Reaping goes through `wait4` rather than `Child::wait` so the kernel's
/// resource accounting for the terminated child comes back with the status.
/// Returns `(status, peak_memory_bytes, timed_out)`.
#[cfg(unix)]
fn wait_with_usage(
    guard: &mut ChildGuard,
    deadline: Instant,
) -> std::io::Result<(ProcessStatus, u64, bool)> {
    let pid = guard.child.id() as libc::pid_t;
    let mut timed_out = false;
    loop {
        let mut raw_status: libc::c_int = 0;
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        let flags = if timed_out { 0 } else { libc::WNOHANG };
        let reaped = unsafe { libc::wait4(pid, &mut raw_status, flags, &mut usage) };
        if reaped == -1 {
            return Err(std::io::Error::last_os_error());
        }
        if reaped == 0 {
            if Instant::now() >= deadline {
                timed_out = true;
                // SIGKILL, then block in wait4 so the rusage of the killed
                // child is still collected.
                let _ = guard.child.kill();
            } else {
                thread::sleep(POLL_INTERVAL);
            }
            continue;
        }
        guard.reaped = true;
        let status = if libc::WIFSIGNALED(raw_status) {
            ProcessStatus::Signaled(libc::WTERMSIG(raw_status))
        } else {
            ProcessStatus::Exited(libc::WEXITSTATUS(raw_status))
        };
        return Ok((status, maxrss_to_bytes(usage.ru_maxrss), timed_out));
    }
}

/// `ru_maxrss` is kilobytes on Linux and the BSDs, bytes on macOS.
/// Reported peak memory is always bytes.
#[cfg(unix)]
fn maxrss_to_bytes(maxrss: libc::c_long) -> u64 {
    let raw = maxrss.max(0) as u64;
    if cfg!(target_os = "macos") {
        raw
    } else {
        raw.saturating_mul(1024)
    }
}

#[cfg(not(unix))]
fn wait_with_usage(
    guard: &mut ChildGuard,
    deadline: Instant,
) -> std::io::Result<(ProcessStatus, u64, bool)> {
    let mut timed_out = false;
    loop {
        if let Some(exit) = guard.child.try_wait()? {
            guard.reaped = true;
            let status = match exit.code() {
                Some(code) => ProcessStatus::Exited(code),
                None => ProcessStatus::Signaled(0),
            };
            // No rusage equivalent is wired up here; peak memory reads as zero.
            return Ok((status, 0, timed_out));
        }
        if !timed_out && Instant::now() >= deadline {
            timed_out = true;
            let _ = guard.child.kill();
        }
        thread::sleep(POLL_INTERVAL);
    }
}
