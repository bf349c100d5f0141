//! Four-stage progressive registration.
//!
//! Every stage re-registers the previous stage's warped output against the
//! same fixed image. Transforms are not composed across stages; only the
//! last stage's chain is kept.

use std::time::Instant;
use burn::tensor::backend::Backend;
use neuroprep_core::image::Image;
use neuroprep_core::transform::TransformChain;
use tracing::{debug, info};
use crate::engine::{RegistrationEngine, TransformKind};
use crate::error::{RegistrationError, Result};

/// Result of a full progressive run.
#[derive(Debug, Clone)]
pub struct AlignedVolume<B: Backend> {
    /// Moving image after the deformable stage, on the fixed grid.
    pub image: Image<B, 3>,
    /// Forward chain of the final stage.
    pub final_transforms: TransformChain<B>,
}

/// Runs Translation, Rigid, Affine and SyN in turn.
pub struct ProgressiveRegistration<'a, B: Backend, E: RegistrationEngine<B> + ?Sized> {
    engine: &'a E,
    _backend: std::marker::PhantomData<B>,
}

impl<'a, B: Backend, E: RegistrationEngine<B> + ?Sized> ProgressiveRegistration<'a, B, E> {
    pub fn new(engine: &'a E) -> Self {
        Self {
            engine,
            _backend: std::marker::PhantomData,
        }
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &'static [TransformKind] {
        &TransformKind::PROGRESSIVE
    }

    /// Align `moving` to `fixed`.
    ///
    /// Stops at the first failing stage and returns its error tagged with
    /// that stage.
    pub fn run(&self, fixed: &Image<B, 3>, moving: &Image<B, 3>) -> Result<AlignedVolume<B>> {
        let mut current = moving.clone();
        let mut final_transforms = TransformChain::identity();

        for &kind in self.stages() {
            let started = Instant::now();
            let output = self
                .engine
                .register(fixed, &current, kind)
                .map_err(|e| RegistrationError::stage(kind, e))?;

            debug!(
                stage = %kind,
                links = output.forward_transforms.len(),
                "stage produced transform chain"
            );
            info!(stage = %kind, elapsed_ms = started.elapsed().as_millis() as u64, "registration stage complete");

            current = output.warped_moving;
            final_transforms = output.forward_transforms;
        }

        Ok(AlignedVolume {
            image: current,
            final_transforms,
        })
    }
}
