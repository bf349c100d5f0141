//! Mask transfer and brain extraction.
//!
//! The template is registered onto the aligned subject (roles reversed from
//! the alignment stages), the brain mask is carried along that chain with
//! nearest neighbor sampling, dilated, and multiplied into the subject.

use burn::tensor::backend::Backend;
use neuroprep_core::filter::{apply_transforms, binary_dilate, mask_image};
use neuroprep_core::image::Image;
use neuroprep_core::interpolation::Interpolation;
use neuroprep_registration::{RegistrationEngine, RegistrationError, TransformKind};
use tracing::debug;
use crate::atlas::ReferenceAtlas;
use crate::error::PipelineError;

/// Ball radius, in voxels, used to grow the transferred mask.
pub const MASK_DILATION_RADIUS: usize = 4;

/// Output of [`extract_brain`].
#[derive(Debug, Clone)]
pub struct BrainExtraction<B: Backend> {
    /// Aligned volume with everything outside the mask set to zero.
    pub extracted: Image<B, 3>,
    /// Dilated binary mask on the aligned volume's grid.
    pub mask: Image<B, 3>,
}

/// Resample the atlas brain mask onto the grid of `aligned`.
///
/// The mask is always sampled with nearest neighbor interpolation so it
/// stays binary.
pub fn transfer_mask<B: Backend, E: RegistrationEngine<B> + ?Sized>(
    engine: &E,
    aligned: &Image<B, 3>,
    atlas: &ReferenceAtlas<B>,
) -> Result<Image<B, 3>, RegistrationError> {
    let output = engine.register(aligned, atlas.template(), TransformKind::SyN)?;
    debug!(links = output.forward_transforms.len(), "template registered onto subject");
    Ok(apply_transforms(
        atlas.brain_mask(),
        aligned,
        output.forward_transforms,
        Interpolation::NearestNeighbor,
    ))
}

/// Transfer, dilate and apply the brain mask.
pub fn extract_brain<B: Backend, E: RegistrationEngine<B> + ?Sized>(
    engine: &E,
    aligned: &Image<B, 3>,
    atlas: &ReferenceAtlas<B>,
) -> Result<BrainExtraction<B>, PipelineError> {
    let transferred = transfer_mask(engine, aligned, atlas).map_err(PipelineError::MaskTransfer)?;
    let mask = binary_dilate(&transferred, MASK_DILATION_RADIUS).map_err(PipelineError::Intensity)?;
    let extracted = mask_image(aligned, &mask).map_err(PipelineError::Intensity)?;
    Ok(BrainExtraction { extracted, mask })
}
