mod compiler;
mod problem;
mod runner;
mod sandbox;

#[cfg(all(test, unix))]
mod sandbox_tests;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cpstress_common::config::HarnessConfig;
use cpstress_common::ledger::Ledger;
use tracing::{info, warn};

use crate::problem::SumOfTwo;

#[derive(Parser)]
#[command(name = "cpstress")]
#[command(about = "Stress-test a candidate solution against randomized cases", long_about = None)]
struct Cli {
    /// Path to the candidate source file
    candidate: PathBuf,

    /// Number of test cases to attempt
    #[arg(short, long)]
    tests: Option<u32>,

    /// Wall-clock limit per test, in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Directory holding compiled artifacts, results, and the run index
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Compiler used for the candidate source
    #[arg(long)]
    compiler: Option<String>,
}

impl Cli {
    fn into_parts(self) -> (PathBuf, HarnessConfig) {
        let mut config = HarnessConfig::default();
        if let Some(tests) = self.tests {
            config.test_count = tests;
        }
        if let Some(ms) = self.time_limit_ms {
            config.time_limit = Duration::from_millis(ms);
        }
        if let Some(dir) = self.state_dir {
            config.state_dir = dir;
        }
        if let Some(compiler) = self.compiler {
            config.compiler = compiler;
        }
        (self.candidate, config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let (candidate, config) = Cli::parse().into_parts();

    info!(
        candidate = %candidate.display(),
        tests = config.test_count,
        time_limit_ms = config.time_limit.as_millis() as u64,
        "cpstress starting"
    );

    let executable = compiler::compile(&config, &candidate)?;

    let ledger = Ledger::new(&config.state_dir);
    let session = ledger.open_session(&candidate)?;
    // Registered before the loop so an interrupted run still shows up in the
    // index. A failed index write is a warning, not a reason to skip testing.
    if let Err(error) = ledger.register_session(&session) {
        warn!(error = %error, "failed to update run index");
    }

    let problem = SumOfTwo;
    let records = runner::run_session(
        &config,
        &ledger,
        &session,
        &executable,
        &problem,
        &problem,
        &problem,
    )
    .await?;

    println!();
    match records.last() {
        Some(last) if !last.result.is_ok() => {
            println!("→ Stopped at test {} with {}", last.test_index, last.result);
        }
        _ => {
            println!("→ All {} tests passed", records.len());
        }
    }
    println!("  Records: {}", session.dir.display());

    Ok(())
}
