//! Error types for the preprocessing pipeline.
//!
//! [`PipelineError`] covers everything that can go wrong with a single
//! volume and never escapes the per-item boundary. [`BatchError`] covers the
//! startup failures that abort a run before any item is processed.

use std::path::PathBuf;
use neuroprep_core::CoreError;
use neuroprep_registration::RegistrationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of the bias-field correction step.
#[derive(Error, Debug)]
pub enum BiasCorrectionError {
    /// The correction engine itself failed.
    #[error("bias correction engine failed: {0}")]
    Engine(#[from] CoreError),

    /// The engine returned an array of a different shape than it was given.
    #[error("bias correction changed volume shape from {expected:?} to {actual:?}")]
    ShapeChanged { expected: [usize; 3], actual: [usize; 3] },
}

/// Failure of one volume's pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source volume could not be read.
    #[error("failed to read input {}: {source:#}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The volume is flat after brain extraction, so it cannot be rescaled.
    #[error("cannot normalize flat volume (min {min}, max {max})")]
    DegenerateNormalization { min: f32, max: f32 },

    /// One of the four alignment stages failed.
    #[error("registration failed: {0}")]
    Registration(#[source] RegistrationError),

    /// Registering the template onto the aligned volume failed.
    #[error("mask transfer registration failed: {0}")]
    MaskTransfer(#[source] RegistrationError),

    /// Bias-field correction failed.
    #[error(transparent)]
    BiasCorrection(#[from] BiasCorrectionError),

    /// A voxel-level operation (clipping, dilation, masking) failed.
    #[error("intensity operation failed: {0}")]
    Intensity(#[source] CoreError),

    /// Processed volume could not be written.
    #[error("failed to write output {}: {source:#}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Numeric code panicked while processing the volume.
    #[error("pipeline panicked: {0}")]
    Panicked(String),
}

/// Reporting category of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InputRead,
    DegenerateNormalization,
    Registration,
    BiasCorrection,
    Intensity,
    OutputWrite,
    Panicked,
}

impl PipelineError {
    /// Category used in batch reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InputRead { .. } => FailureKind::InputRead,
            Self::DegenerateNormalization { .. } => FailureKind::DegenerateNormalization,
            Self::Registration(_) | Self::MaskTransfer(_) => FailureKind::Registration,
            Self::BiasCorrection(_) => FailureKind::BiasCorrection,
            Self::Intensity(_) => FailureKind::Intensity,
            Self::OutputWrite { .. } => FailureKind::OutputWrite,
            Self::Panicked(_) => FailureKind::Panicked,
        }
    }

    /// Map a normalization error, keeping the degenerate case distinct.
    pub fn from_normalization(err: CoreError) -> Self {
        match err {
            CoreError::DegenerateNormalization { min, max } => Self::DegenerateNormalization { min, max },
            other => Self::Intensity(other),
        }
    }
}

/// Fatal failure before or around batch execution.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Template volume could not be read.
    #[error("failed to read template {}: {source:#}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Brain mask could not be read.
    #[error("failed to read brain mask {}: {source:#}", path.display())]
    MaskRead {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Template and mask do not share a voxel grid.
    #[error("template shape {template:?} does not match mask shape {mask:?}")]
    AtlasShapeMismatch { template: [usize; 3], mask: [usize; 3] },

    /// Invalid run configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input directory could not be listed.
    #[error("failed to list inputs in {}: {source}", path.display())]
    InputDiscovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output directory could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
