//! Batch parallel executor.
//!
//! Items are processed on a bounded rayon pool. Results are collected in
//! input order and only then written, so one item's failure cannot touch
//! another item's bookkeeping or output.

use std::path::{Path, PathBuf};
use std::time::Instant;
use burn::tensor::backend::Backend;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{error, info};
use crate::error::{BatchError, PipelineError};
use crate::io::{VolumeReader, VolumeWriter};
use crate::orchestrator::{ItemResult, VolumePipeline};
use crate::progress::{BatchProgress, ProgressTracker};
use crate::report::{BatchReport, FailureRecord, SuccessRecord};

/// Runs a [`VolumePipeline`] over many inputs.
pub struct BatchExecutor<'a, B: Backend> {
    pipeline: VolumePipeline<'a, B>,
    workers: usize,
    progress: Option<&'a dyn BatchProgress>,
}

impl<'a, B: Backend> BatchExecutor<'a, B> {
    pub fn new(pipeline: VolumePipeline<'a, B>, workers: usize) -> Self {
        Self {
            pipeline,
            workers: workers.max(1),
            progress: None,
        }
    }

    /// Report each finished item to `progress`.
    pub fn with_progress(mut self, progress: &'a dyn BatchProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every item on the pool. Results follow input order.
    pub fn process_all<R: VolumeReader<B> + ?Sized>(
        &self,
        items: &[PathBuf],
        reader: &R,
    ) -> Result<Vec<ItemResult<B>>, BatchError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("neuroprep-worker-{i}"))
            .build()?;
        let tracker = ProgressTracker::new(self.progress, items.len());

        Ok(pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = self.pipeline.process(item, reader);
                    tracker.finish(item, result.is_success());
                    result
                })
                .collect()
        }))
    }

    /// Process every item, then write each success to `output_dir` under its
    /// input file name.
    ///
    /// Only an unusable output directory or worker pool is fatal. Item
    /// failures, write failures included, end up in the report.
    pub fn run<R, W>(
        &self,
        items: &[PathBuf],
        reader: &R,
        writer: &W,
        output_dir: &Path,
    ) -> Result<BatchReport, BatchError>
    where
        R: VolumeReader<B> + ?Sized,
        W: VolumeWriter<B> + ?Sized,
    {
        let started = Instant::now();
        std::fs::create_dir_all(output_dir).map_err(|source| BatchError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        info!(items = items.len(), workers = self.workers, "batch started");

        let results = self.process_all(items, reader)?;

        let mut report = BatchReport::default();
        for ItemResult { item, outcome } in results {
            let written = outcome.and_then(|image| {
                let output = output_path(&item, output_dir)?;
                writer.write(&output, &image).map_err(|source| PipelineError::OutputWrite {
                    path: output.clone(),
                    source,
                })?;
                Ok(output)
            });
            match written {
                Ok(output) => {
                    info!(output = %output.display(), "volume written");
                    report.succeeded.push(SuccessRecord { input: item, output });
                }
                Err(err) => {
                    if let PipelineError::OutputWrite { .. } = err {
                        error!(item = %item.display(), error = %err, "write failed");
                    }
                    report.failed.push(FailureRecord::new(item, &err));
                }
            }
        }

        report.elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            elapsed_secs = report.elapsed_secs,
            "batch finished"
        );
        Ok(report)
    }
}

/// `output_dir` joined with the input's file name.
pub fn output_path(item: &Path, output_dir: &Path) -> Result<PathBuf, PipelineError> {
    item.file_name()
        .map(|name| output_dir.join(name))
        .ok_or_else(|| PipelineError::OutputWrite {
            path: output_dir.to_path_buf(),
            source: anyhow::anyhow!("input {} has no file name", item.display()),
        })
}
