use std::path::PathBuf;
use anyhow::{Context, Result};
use burn_ndarray::NdArray;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use neuroprep_core::filter::SmoothFieldCorrector;
use neuroprep_pipeline::{
    BatchConfig, BatchExecutor, BatchProgress, ItemProgress, NiftiReader, NiftiWriter, PipelineConfig,
    ReferenceAtlas, VolumePipeline,
};
use neuroprep_registration::{MomentsDemonsEngine, RegistrationConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod discovery;

use discovery::discover_inputs;

type Backend = NdArray<f32>;

#[derive(Parser)]
#[command(name = "neuroprep")]
#[command(about = "Batch preprocessing of 3D brain MRI volumes", version)]
struct Cli {
    /// Reference template volume
    #[arg(long, env = "NEUROPREP_TEMPLATE")]
    template: PathBuf,

    /// Binary brain mask in template space
    #[arg(long, env = "NEUROPREP_MASK")]
    mask: PathBuf,

    /// Directory holding raw .nii / .nii.gz volumes
    #[arg(short, long, env = "NEUROPREP_INPUT_DIR")]
    input_dir: PathBuf,

    /// Directory receiving processed volumes
    #[arg(short, long, env = "NEUROPREP_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Worker pool size (defaults to the number of cores)
    #[arg(short, long, env = "NEUROPREP_WORKERS")]
    workers: Option<usize>,

    /// Lower winsorizing percentile
    #[arg(long, default_value_t = 1.0)]
    lower_percentile: f64,

    /// Upper winsorizing percentile
    #[arg(long, default_value_t = 99.0)]
    upper_percentile: f64,

    /// Bias correction shrink factor
    #[arg(long, default_value_t = 2)]
    shrink_factor: usize,

    /// Bias field smoothing sigma in millimetres
    #[arg(long, default_value_t = 20.0)]
    bias_sigma: f64,

    /// Demons iterations in the deformable registration stage
    #[arg(long, default_value_t = 40)]
    demons_iterations: usize,

    /// Write a JSON batch report here
    #[arg(long, env = "NEUROPREP_REPORT")]
    report: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn batch_config(&self) -> BatchConfig {
        let pipeline = PipelineConfig::new()
            .with_percentiles(self.lower_percentile, self.upper_percentile)
            .with_shrink_factor(self.shrink_factor);
        let mut config = BatchConfig::new(&self.template, &self.mask, &self.input_dir, &self.output_dir)
            .with_pipeline(pipeline);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(report) = &self.report {
            config = config.with_report(report);
        }
        config
    }
}

/// Drives an indicatif bar from worker threads.
struct BarProgress(ProgressBar);

impl BatchProgress for BarProgress {
    fn on_start(&self, total: usize) {
        self.0.set_length(total as u64);
    }

    fn on_item_finished(&self, progress: &ItemProgress) {
        if let Some(name) = progress.item.file_name() {
            self.0.set_message(name.to_string_lossy().into_owned());
        }
        self.0.inc(1);
    }
}

fn progress_bar(enabled: bool) -> Result<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.batch_config();
    config.validate()?;

    let items = discover_inputs(&config.input_dir)?;
    if items.is_empty() {
        warn!(input_dir = %config.input_dir.display(), "no NIfTI volumes found");
    }

    let device = Default::default();
    let reader = NiftiReader::<Backend>::new(device);
    let writer = NiftiWriter::<Backend>::new();
    let atlas = ReferenceAtlas::load(&reader, &config.template, &config.mask)?;

    let engine = MomentsDemonsEngine::new(RegistrationConfig::new().with_demons_iterations(cli.demons_iterations))?;
    let corrector = SmoothFieldCorrector::new(cli.bias_sigma, SmoothFieldCorrector::default().foreground_fraction);
    let pipeline = VolumePipeline::new(config.pipeline, &atlas, &engine, &corrector);

    let bar = BarProgress(progress_bar(!cli.no_progress)?);
    let report = BatchExecutor::new(pipeline, config.workers)
        .with_progress(&bar)
        .run(&items, &reader, &writer, &config.output_dir)?;
    bar.0.finish_and_clear();

    for failure in &report.failed {
        warn!(item = %failure.item.display(), kind = ?failure.kind, "{}", failure.detail);
    }
    if let Some(path) = &config.report {
        report
            .write_json(path)
            .with_context(|| format!("failed to save batch report to {}", path.display()))?;
        info!(report = %path.display(), "report written");
    }
    info!(
        "{} of {} volumes processed in {:.1}s",
        report.success_count(),
        report.total(),
        report.elapsed_secs
    );
    Ok(())
}
