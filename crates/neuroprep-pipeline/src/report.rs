//! Batch report.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::error::{FailureKind, PipelineError};

/// A processed and written item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessRecord {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// A failed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub item: PathBuf,
    pub kind: FailureKind,
    pub detail: String,
}

impl FailureRecord {
    pub fn new(item: impl Into<PathBuf>, error: &PipelineError) -> Self {
        Self {
            item: item.into(),
            kind: error.kind(),
            detail: error.to_string(),
        }
    }
}

/// Summary of a batch run. Both lists follow input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: Vec<SuccessRecord>,
    pub failed: Vec<FailureRecord>,
    pub elapsed_secs: f64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Output path written for `input`, if it succeeded.
    pub fn output_for(&self, input: &Path) -> Option<&Path> {
        self.succeeded
            .iter()
            .find(|r| r.input == input)
            .map(|r| r.output.as_path())
    }

    /// Save as pretty-printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("failed to create report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        Ok(())
    }
}
