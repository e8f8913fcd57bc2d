use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome label attached to a single test case.
///
/// The serialized spellings are an external contract: downstream report
/// viewers match on them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WRONG_ANSWER")]
    WrongAnswer,
    #[serde(rename = "RUNTIME_ERROR")]
    RuntimeError,
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
}

impl Verdict {
    pub fn is_ok(self) -> bool {
        matches!(self, Verdict::Ok)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Ok => "OK",
            Verdict::WrongAnswer => "WRONG_ANSWER",
            Verdict::RuntimeError => "RUNTIME_ERROR",
            Verdict::InvalidInput => "INVALID_INPUT",
        };
        f.write_str(label)
    }
}

/// Wall time and peak resident memory for one finished candidate process.
///
/// Peak memory is always bytes here, whatever unit the host platform reports
/// natively; the sandbox normalizes before constructing this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    pub elapsed: Duration,
    pub peak_memory_bytes: u64,
}

impl ResourceUsage {
    pub fn time_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    pub fn memory_mb(&self) -> f64 {
        self.peak_memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// One persisted test result.
///
/// Serialized field names (`testcase_input`, `output`, `result`, `time_ms`,
/// `memory_MB`) are part of the on-disk contract and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub test_index: u32,
    pub testcase_input: String,
    pub output: String,
    pub result: Verdict,
    pub time_ms: u64,
    #[serde(rename = "memory_MB")]
    pub memory_mb: f64,
}

impl TestRecord {
    pub fn new(
        test_index: u32,
        input: impl Into<String>,
        output: impl Into<String>,
        result: Verdict,
        usage: ResourceUsage,
    ) -> Self {
        Self {
            test_index,
            testcase_input: input.into(),
            output: output.into(),
            result,
            time_ms: usage.time_ms(),
            memory_mb: usage.memory_mb(),
        }
    }
}
