//! Reader and writer collaborators.

use std::marker::PhantomData;
use std::path::Path;
use anyhow::Result;
use burn::tensor::backend::Backend;
use neuroprep_core::image::Image;
use neuroprep_io::{is_nifti_path, read_nifti, write_nifti};

/// Loads a volume from disk with origin, spacing and direction populated.
pub trait VolumeReader<B: Backend>: Send + Sync {
    fn read(&self, path: &Path) -> Result<Image<B, 3>>;
}

/// Persists a volume with its spatial metadata, replacing any existing file.
pub trait VolumeWriter<B: Backend>: Send + Sync {
    fn write(&self, path: &Path, image: &Image<B, 3>) -> Result<()>;
}

/// NIfTI reader placing volumes on a fixed device.
#[derive(Debug, Clone)]
pub struct NiftiReader<B: Backend> {
    device: B::Device,
}

impl<B: Backend> NiftiReader<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Default for NiftiReader<B> {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<B: Backend> VolumeReader<B> for NiftiReader<B> {
    fn read(&self, path: &Path) -> Result<Image<B, 3>> {
        if !is_nifti_path(path) {
            anyhow::bail!("{} is not a .nii or .nii.gz file", path.display());
        }
        read_nifti(path, &self.device)
    }
}

/// NIfTI writer; gzip is chosen by a `.nii.gz` destination.
#[derive(Debug, Clone, Default)]
pub struct NiftiWriter<B: Backend> {
    _backend: PhantomData<B>,
}

impl<B: Backend> NiftiWriter<B> {
    pub fn new() -> Self {
        Self { _backend: PhantomData }
    }
}

impl<B: Backend> VolumeWriter<B> for NiftiWriter<B> {
    fn write(&self, path: &Path, image: &Image<B, 3>) -> Result<()> {
        write_nifti(path, image)
    }
}
