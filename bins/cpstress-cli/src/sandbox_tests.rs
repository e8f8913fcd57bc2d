/// Sandbox integration tests against real processes.
///
/// These run tiny system utilities (`/bin/cat`, shell one-liners), so they
/// are unix-only. The properties pinned down here are the ones the
/// controller depends on: faithful echo, crash classification with partial
/// output, no pipe deadlock on oversized input, and the wall-clock kill.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::sandbox::{self, ProcessStatus, RunOutcome};

const TIME_LIMIT: Duration = Duration::from_secs(5);

fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn echo_candidate_completes_with_input_as_output() {
    match sandbox::run(Path::new("/bin/cat"), "3 4\n", TIME_LIMIT).await {
        RunOutcome::Completed { stdout, usage, .. } => {
            assert_eq!(stdout, "3 4\n");
            assert!(usage.peak_memory_bytes > 0);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[tokio::test]
async fn large_input_does_not_deadlock() {
    // Well past any platform pipe buffer.
    let input = "x".repeat(8 * 1024 * 1024);
    match sandbox::run(Path::new("/bin/cat"), &input, Duration::from_secs(60)).await {
        RunOutcome::Completed { stdout, .. } => assert_eq!(stdout.len(), input.len()),
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[tokio::test]
async fn nonzero_exit_is_a_crash() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = script(&tmp, "always_fails", "exit 1");
    match sandbox::run(&exe, "anything\n", TIME_LIMIT).await {
        RunOutcome::Crashed {
            status, timed_out, ..
        } => {
            assert_eq!(status, ProcessStatus::Exited(1));
            assert!(!timed_out);
        }
        other => panic!("expected Crashed, got {other:?}"),
    }
}

#[tokio::test]
async fn crash_keeps_partial_output() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = script(&tmp, "partial", "echo partial\nexit 3");
    match sandbox::run(&exe, "", TIME_LIMIT).await {
        RunOutcome::Crashed { stdout, status, .. } => {
            assert_eq!(stdout, "partial\n");
            assert_eq!(status, ProcessStatus::Exited(3));
        }
        other => panic!("expected Crashed, got {other:?}"),
    }
}

#[tokio::test]
async fn early_exit_with_unread_input_is_a_crash_not_a_launch_failure() {
    // The child never reads its stdin, so the harness-side write hits a
    // broken pipe; that must fold into the child's own exit classification.
    let tmp = tempfile::tempdir().unwrap();
    let exe = script(&tmp, "ignores_stdin", "exit 7");
    let input = "y".repeat(4 * 1024 * 1024);
    match sandbox::run(&exe, &input, Duration::from_secs(60)).await {
        RunOutcome::Crashed { status, .. } => assert_eq!(status, ProcessStatus::Exited(7)),
        other => panic!("expected Crashed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_executable_is_a_spawn_failure() {
    match sandbox::run(Path::new("/definitely/not/a/real/binary"), "", TIME_LIMIT).await {
        RunOutcome::SpawnFailed { reason } => assert!(reason.contains("failed to start")),
        other => panic!("expected SpawnFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn hung_candidate_is_killed_at_the_deadline() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = script(&tmp, "hangs", "exec sleep 30");
    let started = Instant::now();
    match sandbox::run(&exe, "", Duration::from_millis(300)).await {
        RunOutcome::Crashed {
            status, timed_out, ..
        } => {
            assert!(timed_out);
            assert!(matches!(status, ProcessStatus::Signaled(_)));
            assert!(started.elapsed() < Duration::from_secs(10));
        }
        other => panic!("expected Crashed, got {other:?}"),
    }
}
