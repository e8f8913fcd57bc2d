/// Test Loop Controller - Fail-Fast Orchestration
///
/// **Responsibility:**
/// Drive generate → validate → execute → check per test index, persist every
/// record, and stop at the first failure.
///
/// This module is the glue layer - it knows nothing about:
/// - How processes run (sandbox's job)
/// - What the problem is (strategies' job)
/// - How records reach disk (ledger's job)
///
/// Stopping early is the point: the harness optimizes for fast localization
/// of the first failing case, not for a pass/fail tally across all cases.
/// A launch failure is different: it aborts the whole session as a harness
/// problem rather than producing a verdict.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use cpstress_common::config::HarnessConfig;
use cpstress_common::ledger::{Ledger, RunSession};
use cpstress_common::strategy::{Checker, Generator, Validator};
use cpstress_common::types::{ResourceUsage, TestRecord, Verdict};
use tracing::{debug, info, warn};

use crate::sandbox::{self, RunOutcome};

/// Run up to `config.test_count` tests, fail-fast.
///
/// Returns every record produced, in order; when the session did not run
/// clean, the last record carries the stopping verdict. Each record is
/// persisted before the loop proceeds or stops, so a crash after test `i`
/// leaves indices `1..=i` durably recorded and nothing beyond.
pub async fn run_session(
    config: &HarnessConfig,
    ledger: &Ledger,
    session: &RunSession,
    executable: &Path,
    generator: &dyn Generator,
    validator: &dyn Validator,
    checker: &dyn Checker,
) -> Result<Vec<TestRecord>> {
    let session_seed = session_seed();
    let mut records = Vec::new();

    println!(
        "→ Running up to {} tests against {}",
        config.test_count, session.candidate_name
    );
    println!("  Session: {}", session.run_id);
    println!();

    for index in 1..=config.test_count {
        // One clock reading per session, offset by the index: distinct per
        // test, replayable from the printed seed.
        let seed = session_seed.wrapping_add(u64::from(index));
        let input = generator.generate(seed);
        debug!(test_index = index, seed, "generated input");

        if !validator.validate(&input) {
            // Generator/validator disagreement is a harness-side bug; the
            // candidate never ran, so resources read as zero.
            let record = TestRecord::new(
                index,
                input.clone(),
                String::new(),
                Verdict::InvalidInput,
                ResourceUsage::default(),
            );
            push_record(ledger, session, record, &mut records);
            println!("  Test {index}: INVALID INPUT (generator/validator bug)");
            println!("    seed: {seed}");
            print_block("input", &input);
            break;
        }

        match sandbox::run(executable, &input, config.time_limit).await {
            RunOutcome::SpawnFailed { reason } => {
                bail!("failed to launch candidate: {reason}");
            }
            RunOutcome::Crashed {
                stdout,
                stderr,
                status,
                timed_out,
                usage,
            } => {
                let record = TestRecord::new(
                    index,
                    input.clone(),
                    stdout.clone(),
                    Verdict::RuntimeError,
                    usage,
                );
                push_record(ledger, session, record, &mut records);
                if timed_out {
                    println!(
                        "  Test {index}: RUNTIME ERROR (killed after {} ms)",
                        config.time_limit.as_millis()
                    );
                } else {
                    println!("  Test {index}: RUNTIME ERROR ({status})");
                }
                println!("    seed: {seed}");
                print_block("input", &input);
                print_block("output", &stdout);
                if !stderr.is_empty() {
                    print_block("stderr", &stderr);
                }
                break;
            }
            RunOutcome::Completed {
                stdout,
                stderr,
                usage,
            } => {
                if !stderr.is_empty() {
                    debug!(test_index = index, stderr = %stderr.lines().next().unwrap_or(""), "candidate wrote to stderr");
                }
                let verdict = if checker.check(&input, &stdout) {
                    Verdict::Ok
                } else {
                    Verdict::WrongAnswer
                };
                let record =
                    TestRecord::new(index, input.clone(), stdout.clone(), verdict, usage);
                push_record(ledger, session, record, &mut records);
                if verdict.is_ok() {
                    println!(
                        "  Test {index}: OK ({} ms, {:.1} MB)",
                        usage.time_ms(),
                        usage.memory_mb()
                    );
                } else {
                    println!("  Test {index}: WRONG ANSWER");
                    println!("    seed: {seed}");
                    print_block("input", &input);
                    print_block("output", &stdout);
                    break;
                }
            }
        }
    }

    let stopped_early = records.last().is_some_and(|r| !r.result.is_ok());
    info!(
        tests_run = records.len(),
        stopped_early,
        "session finished"
    );
    Ok(records)
}

/// Persist before moving on. A failed write only warns: the in-memory
/// record still decides the console outcome.
fn push_record(
    ledger: &Ledger,
    session: &RunSession,
    record: TestRecord,
    records: &mut Vec<TestRecord>,
) {
    if let Err(error) = ledger.persist(session, &record) {
        warn!(
            test_index = record.test_index,
            error = %error,
            "failed to persist test record"
        );
    }
    records.push(record);
}

fn session_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn print_block(label: &str, text: &str) {
    if text.is_empty() {
        println!("    {label}: <empty>");
    } else {
        println!("    {label}:");
        for line in text.lines() {
            println!("      {line}");
        }
    }
}
