//! Interpolation types and operations.
//!
//! This module provides interpolation traits and implementations
//! for sampling voxel values at continuous indices.

pub mod trait_;
pub mod linear;
pub mod nearest;

use serde::{Deserialize, Serialize};

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;

/// Interpolation mode selected at a resampling call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Trilinear blending of the eight surrounding voxels.
    Linear,
    /// Value of the closest voxel; keeps label and mask images label-valued.
    NearestNeighbor,
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interpolation::Linear => write!(f, "linear"),
            Interpolation::NearestNeighbor => write!(f, "nearestNeighbor"),
        }
    }
}
