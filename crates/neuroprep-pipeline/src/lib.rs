//! MRI preprocessing pipeline for neuroprep.
//!
//! A [`VolumePipeline`] takes one raw volume through outlier clipping, bias
//! correction, progressive registration to a reference template, brain
//! extraction and intensity normalization. A [`BatchExecutor`] fans the
//! pipeline out over many volumes with per-item failure isolation.

pub mod atlas;
pub mod bias;
pub mod config;
pub mod error;
pub mod executor;
pub mod extraction;
pub mod io;
pub mod orchestrator;
pub mod progress;
pub mod report;

pub use atlas::ReferenceAtlas;
pub use bias::{correct_bias, BiasFieldCorrector};
pub use config::{BatchConfig, PipelineConfig};
pub use error::{BatchError, BiasCorrectionError, FailureKind, PipelineError};
pub use executor::BatchExecutor;
pub use extraction::{extract_brain, transfer_mask, BrainExtraction, MASK_DILATION_RADIUS};
pub use io::{NiftiReader, NiftiWriter, VolumeReader, VolumeWriter};
pub use orchestrator::{ItemResult, VolumePipeline};
pub use progress::{BatchProgress, HistoryProgress, ItemProgress, LogProgress};
pub use report::{BatchReport, FailureRecord, SuccessRecord};
