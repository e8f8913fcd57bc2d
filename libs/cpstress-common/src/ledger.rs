//! Durable run state.
//!
//! One directory per session, one JSON file per test result, and a
//! cross-session index (`main.json`) mapping candidate name to every run id
//! ever recorded for it. The index is the single source of truth for which
//! sessions exist; session directories are its payload.
//!
//! The index is read once at startup and written back in full before the
//! test loop begins, so an interrupted session still appears in it. There is
//! no cross-process locking: two harness invocations sharing one state
//! directory race on the index and the last writer wins.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use crate::codec::{self, RunIndex};
use crate::types::TestRecord;

/// Well-known index file name under the results directory.
pub const INDEX_FILE: &str = "main.json";

/// One harness invocation against one candidate.
#[derive(Debug, Clone)]
pub struct RunSession {
    /// File name of the candidate source, e.g. `a_plus_b.cpp`.
    pub candidate_name: String,
    /// Timestamp-derived identifier, unique per candidate per millisecond.
    pub run_id: String,
    /// Directory holding this session's `test_<i>.json` records.
    pub dir: PathBuf,
}

pub struct Ledger {
    results_dir: PathBuf,
}

impl Ledger {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            results_dir: state_dir.join("results"),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.results_dir.join(INDEX_FILE)
    }

    /// Create a fresh session directory named from the candidate identity
    /// and a UTC timestamp.
    ///
    /// `create_dir_all` treats an identically named directory from the same
    /// clock instant as success; any other creation failure is fatal since
    /// nothing about the session could be persisted.
    pub fn open_session(&self, candidate: &Path) -> Result<RunSession> {
        let candidate_name = candidate
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("candidate path {} has no file name", candidate.display()))?;
        let run_id = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string();
        let dir = self.results_dir.join(&candidate_name).join(&run_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create session directory {}", dir.display()))?;
        Ok(RunSession {
            candidate_name,
            run_id,
            dir,
        })
    }

    /// Append the session to the cross-run index and write the index back in
    /// full. Called once, before the test loop, so a crash mid-run still
    /// records that the session was attempted.
    pub fn register_session(&self, session: &RunSession) -> Result<()> {
        let mut index = self.load_index();
        index
            .entry(session.candidate_name.clone())
            .or_default()
            .push(session.run_id.clone());
        self.save_index(&index)
    }

    /// Write one result record to its own file, named by test index so
    /// records are independently inspectable and never overwrite each other.
    pub fn persist(&self, session: &RunSession, record: &TestRecord) -> Result<()> {
        let path = session.dir.join(format!("test_{}.json", record.test_index));
        let body = serde_json::to_string_pretty(record)
            .context("failed to serialize test record")?;
        fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Read the index. A missing, empty, or malformed store is an empty
    /// mapping; the harness keeps running and overwrites it on save.
    pub fn load_index(&self) -> RunIndex {
        let path = self.index_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => return RunIndex::new(),
        };
        match codec::decode(&text) {
            Some(index) => index,
            None => {
                warn!(
                    path = %path.display(),
                    "run index is malformed; starting from an empty index"
                );
                RunIndex::new()
            }
        }
    }

    /// Overwrite the durable index with the complete in-memory mapping.
    pub fn save_index(&self, index: &RunIndex) -> Result<()> {
        fs::create_dir_all(&self.results_dir).with_context(|| {
            format!("failed to create results directory {}", self.results_dir.display())
        })?;
        let path = self.index_path();
        fs::write(&path, codec::encode(index))
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
