//! Run configuration.

use std::path::{Path, PathBuf};
use neuroprep_core::filter::intensity::{DEFAULT_LOWER_PERCENTILE, DEFAULT_UPPER_PERCENTILE};
use serde::{Deserialize, Serialize};
use crate::error::BatchError;

/// Shrink factor handed to the bias corrector when none is given.
pub const DEFAULT_SHRINK_FACTOR: usize = 2;

/// Per-volume processing parameters. Static for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Lower winsorizing percentile.
    pub lower_percentile: f64,
    /// Upper winsorizing percentile.
    pub upper_percentile: f64,
    /// Downsampling factor used inside bias correction.
    pub shrink_factor: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lower_percentile: DEFAULT_LOWER_PERCENTILE,
            upper_percentile: DEFAULT_UPPER_PERCENTILE,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the winsorizing percentile pair.
    pub fn with_percentiles(mut self, lower: f64, upper: f64) -> Self {
        self.lower_percentile = lower;
        self.upper_percentile = upper;
        self
    }

    /// Set the bias correction shrink factor.
    pub fn with_shrink_factor(mut self, shrink_factor: usize) -> Self {
        self.shrink_factor = shrink_factor;
        self
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        let (lower, upper) = (self.lower_percentile, self.upper_percentile);
        if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper {
            return Err(BatchError::InvalidConfig(format!(
                "percentiles must satisfy 0 <= lower < upper <= 100, got {lower} and {upper}"
            )));
        }
        if self.shrink_factor == 0 {
            return Err(BatchError::InvalidConfig("shrink factor must be at least 1".into()));
        }
        Ok(())
    }
}

/// Everything a batch run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Reference template volume.
    pub template: PathBuf,
    /// Binary brain mask in template space.
    pub mask: PathBuf,
    /// Directory holding the raw volumes.
    pub input_dir: PathBuf,
    /// Directory receiving processed volumes.
    pub output_dir: PathBuf,
    /// Worker pool size.
    pub workers: usize,
    pub pipeline: PipelineConfig,
    /// Optional JSON report destination.
    pub report: Option<PathBuf>,
}

impl BatchConfig {
    /// Create a config with default pipeline settings and one worker per core.
    pub fn new(
        template: impl Into<PathBuf>,
        mask: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            template: template.into(),
            mask: mask.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            workers: default_workers(),
            pipeline: PipelineConfig::default(),
            report: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Write a JSON report to `path` after the run.
    pub fn with_report<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.report = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.workers == 0 {
            return Err(BatchError::InvalidConfig("worker count must be at least 1".into()));
        }
        if self.input_dir == self.output_dir {
            return Err(BatchError::InvalidConfig(format!(
                "output directory {} must differ from the input directory",
                self.output_dir.display()
            )));
        }
        self.pipeline.validate()
    }
}

/// Number of available cores, or 1 when it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
