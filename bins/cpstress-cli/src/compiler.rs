// External compiler invocation for the candidate source.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use cpstress_common::config::HarnessConfig;
use tracing::info;

/// Compile the candidate into `<state>/temp/<executable_name>`.
///
/// Compiler diagnostics go straight to the console; a nonzero exit aborts
/// the harness before any session is created.
pub fn compile(config: &HarnessConfig, source: &Path) -> Result<PathBuf> {
    let temp_dir = config.temp_dir();
    fs::create_dir_all(&temp_dir)
        .with_context(|| format!("failed to create temp directory {}", temp_dir.display()))?;
    let executable = temp_dir.join(&config.executable_name);

    println!("→ Compiling {} with {}", source.display(), config.compiler);
    let status = Command::new(&config.compiler)
        .args(&config.compile_flags)
        .arg(source)
        .arg("-o")
        .arg(&executable)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("failed to run {}; is it installed?", config.compiler))?;

    if !status.success() {
        bail!("compilation failed with {status}");
    }

    info!(executable = %executable.display(), "candidate compiled");
    Ok(executable)
}
