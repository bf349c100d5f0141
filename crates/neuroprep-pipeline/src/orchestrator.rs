//! Per-volume pipeline.
//!
//! winsorize → bias-correct → winsorize → register (4 stages) →
//! extract → normalize. Every failure, panics included, comes back as a
//! value tagged with the item it belongs to.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use burn::tensor::backend::Backend;
use neuroprep_core::filter::{normalize, winsorize};
use neuroprep_core::image::Image;
use neuroprep_registration::{ProgressiveRegistration, RegistrationEngine};
use tracing::{debug, info, warn};
use crate::atlas::ReferenceAtlas;
use crate::bias::{correct_bias, BiasFieldCorrector};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extraction::extract_brain;
use crate::io::VolumeReader;

/// Outcome of one item.
#[derive(Debug)]
pub struct ItemResult<B: Backend> {
    /// Input path the result belongs to.
    pub item: PathBuf,
    pub outcome: Result<Image<B, 3>, PipelineError>,
}

impl<B: Backend> ItemResult<B> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// The fixed per-volume processing sequence.
///
/// Holds only shared references, so one instance serves every worker.
pub struct VolumePipeline<'a, B: Backend> {
    config: PipelineConfig,
    atlas: &'a ReferenceAtlas<B>,
    engine: &'a dyn RegistrationEngine<B>,
    corrector: &'a dyn BiasFieldCorrector<B>,
}

impl<'a, B: Backend> VolumePipeline<'a, B> {
    pub fn new(
        config: PipelineConfig,
        atlas: &'a ReferenceAtlas<B>,
        engine: &'a dyn RegistrationEngine<B>,
        corrector: &'a dyn BiasFieldCorrector<B>,
    ) -> Self {
        Self {
            config,
            atlas,
            engine,
            corrector,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read and process one item. Never panics and never returns early.
    pub fn process<R: VolumeReader<B> + ?Sized>(&self, item: &Path, reader: &R) -> ItemResult<B> {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let image = reader.read(item).map_err(|source| PipelineError::InputRead {
                path: item.to_path_buf(),
                source,
            })?;
            self.run(&image)
        }))
        .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(payload.as_ref()))));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => info!(item = %item.display(), elapsed_ms, "volume processed"),
            Err(err) => warn!(item = %item.display(), kind = ?err.kind(), error = %err, "volume failed"),
        }
        ItemResult {
            item: item.to_path_buf(),
            outcome,
        }
    }

    /// Run the processing sequence on a loaded volume.
    pub fn run(&self, image: &Image<B, 3>) -> Result<Image<B, 3>, PipelineError> {
        let PipelineConfig {
            lower_percentile,
            upper_percentile,
            shrink_factor,
        } = self.config;

        let clipped = winsorize(image, lower_percentile, upper_percentile).map_err(PipelineError::Intensity)?;
        debug!("winsorized raw volume");

        let corrected = correct_bias(self.corrector, &clipped, shrink_factor)?;
        let clipped = winsorize(&corrected, lower_percentile, upper_percentile).map_err(PipelineError::Intensity)?;
        debug!("winsorized bias-corrected volume");

        let aligned = ProgressiveRegistration::new(self.engine)
            .run(self.atlas.template(), &clipped)
            .map_err(PipelineError::Registration)?;

        let extraction = extract_brain(self.engine, &aligned.image, self.atlas)?;
        debug!("brain extracted");

        normalize(&extraction.extracted).map_err(PipelineError::from_normalization)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
