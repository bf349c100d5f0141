//! Error types for core image operations.

use thiserror::Error;

/// Errors raised by image construction and voxel-level filters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The image contains no voxels.
    #[error("image is empty")]
    EmptyImage,

    /// Intensities are constant (or non-finite), so no linear rescale to [0, 1] exists.
    #[error("degenerate intensity range: min {min}, max {max}")]
    DegenerateNormalization { min: f32, max: f32 },

    /// Percentile pair outside `0 <= lower < upper <= 100`.
    #[error("invalid percentile range: lower {lower}, upper {upper}")]
    InvalidPercentiles { lower: f64, upper: f64 },

    /// Two images that must share a voxel grid do not.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Number of values does not fit the requested shape.
    #[error("data length {len} does not match shape {shape:?}")]
    DataLength { len: usize, shape: Vec<usize> },

    /// Tensor data could not be read back to the host.
    #[error("tensor data error: {0}")]
    TensorData(String),

    /// Invalid filter parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
