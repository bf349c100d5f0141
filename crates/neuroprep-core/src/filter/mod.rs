//! Image filters.
//!
//! Resampling, smoothing and downsampling, plus the voxel-level operations
//! used by the preprocessing pipeline: intensity clipping and rescaling,
//! binary morphology and bias field correction.

pub mod gaussian;
pub mod downsample;
pub mod resample;
pub mod intensity;
pub mod morphology;
pub mod bias_field;

pub use gaussian::GaussianFilter;
pub use downsample::DownsampleFilter;
pub use resample::{apply_transforms, ResampleImageFilter};
pub use intensity::{mask_image, normalize, percentile, percentile_bounds, winsorize, IntensityBounds};
pub use morphology::binary_dilate;
pub use bias_field::SmoothFieldCorrector;
