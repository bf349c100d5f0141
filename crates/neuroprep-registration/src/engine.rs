//! Registration engine contract.

use std::fmt;
use burn::tensor::backend::Backend;
use neuroprep_core::image::Image;
use neuroprep_core::transform::TransformChain;
use serde::{Deserialize, Serialize};
use crate::error::Result;

/// Transform class requested from a registration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    /// Global offset.
    Translation,
    /// Offset plus rotation.
    Rigid,
    /// Offset, rotation, scale and shear.
    Affine,
    /// Affine followed by a dense deformation.
    SyN,
}

impl TransformKind {
    /// Stages of progressive registration, in order.
    pub const PROGRESSIVE: [TransformKind; 4] = [
        TransformKind::Translation,
        TransformKind::Rigid,
        TransformKind::Affine,
        TransformKind::SyN,
    ];

    /// Engine token for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Translation => "Translation",
            TransformKind::Rigid => "Rigid",
            TransformKind::Affine => "Affine",
            TransformKind::SyN => "SyN",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a registration call hands back.
#[derive(Debug, Clone)]
pub struct RegistrationOutput<B: Backend> {
    /// Moving image resampled onto the fixed grid.
    pub warped_moving: Image<B, 3>,
    /// Maps fixed-space points into moving space; the chain used to build `warped_moving`.
    pub forward_transforms: TransformChain<B>,
}

/// A registration engine.
///
/// Implementations hold no mutable state between calls, so one engine can
/// be shared by every worker of a batch.
pub trait RegistrationEngine<B: Backend>: Send + Sync {
    /// Align `moving` to `fixed` with a transform of the given kind.
    fn register(
        &self,
        fixed: &Image<B, 3>,
        moving: &Image<B, 3>,
        kind: TransformKind,
    ) -> Result<RegistrationOutput<B>>;
}
