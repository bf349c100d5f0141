//! Reference template and brain mask.

use std::path::Path;
use burn::tensor::backend::Backend;
use neuroprep_core::image::Image;
use tracing::info;
use crate::error::BatchError;
use crate::io::VolumeReader;

/// Template and brain mask shared read-only by every worker of a batch.
#[derive(Debug, Clone)]
pub struct ReferenceAtlas<B: Backend> {
    template: Image<B, 3>,
    brain_mask: Image<B, 3>,
}

impl<B: Backend> ReferenceAtlas<B> {
    /// Pair a template with its mask; both must share a voxel grid shape.
    pub fn new(template: Image<B, 3>, brain_mask: Image<B, 3>) -> Result<Self, BatchError> {
        if template.shape() != brain_mask.shape() {
            return Err(BatchError::AtlasShapeMismatch {
                template: template.shape(),
                mask: brain_mask.shape(),
            });
        }
        Ok(Self { template, brain_mask })
    }

    /// Read both volumes. Any failure here is fatal for the batch.
    pub fn load<R: VolumeReader<B> + ?Sized>(reader: &R, template: &Path, mask: &Path) -> Result<Self, BatchError> {
        let template_image = reader.read(template).map_err(|source| BatchError::TemplateRead {
            path: template.to_path_buf(),
            source,
        })?;
        let mask_image = reader.read(mask).map_err(|source| BatchError::MaskRead {
            path: mask.to_path_buf(),
            source,
        })?;
        info!(
            template = %template.display(),
            mask = %mask.display(),
            shape = ?template_image.shape(),
            "reference atlas loaded"
        );
        Self::new(template_image, mask_image)
    }

    pub fn template(&self) -> &Image<B, 3> {
        &self.template
    }

    pub fn brain_mask(&self) -> &Image<B, 3> {
        &self.brain_mask
    }
}
