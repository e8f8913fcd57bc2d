use std::path::PathBuf;
use std::time::Duration;

/// Harness configuration, passed explicitly into the controller.
///
/// Every knob has a documented default so `HarnessConfig::default()` is a
/// complete, runnable configuration; the CLI overrides individual fields.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Compiler binary used for the candidate source. Default: `g++`.
    pub compiler: String,
    /// Flags handed to the compiler ahead of the source path.
    /// Default: `-std=c++17 -O2 -Wall`.
    pub compile_flags: Vec<String>,
    /// Number of test cases attempted per session. Default: 100.
    pub test_count: u32,
    /// Wall-clock limit per candidate run; on expiry the child is killed
    /// and the test is a runtime error. Default: 2000 ms.
    pub time_limit: Duration,
    /// Root of the harness's durable state; `results/` and `temp/` live
    /// under it. Default: `.cpstress`.
    pub state_dir: PathBuf,
    /// File name of the compiled candidate inside `temp/`.
    /// Default: `solution`.
    pub executable_name: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: "g++".to_string(),
            compile_flags: vec![
                "-std=c++17".to_string(),
                "-O2".to_string(),
                "-Wall".to_string(),
            ],
            test_count: 100,
            time_limit: Duration::from_millis(2000),
            state_dir: PathBuf::from(".cpstress"),
            executable_name: "solution".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Scratch directory for compiled artifacts.
    pub fn temp_dir(&self) -> PathBuf {
        self.state_dir.join("temp")
    }

    /// Root directory for session results and the run index.
    pub fn results_dir(&self) -> PathBuf {
        self.state_dir.join("results")
    }
}
