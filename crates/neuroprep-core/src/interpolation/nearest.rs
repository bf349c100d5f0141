//! Nearest neighbor interpolation implementation.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use super::trait_::{split_columns, Interpolator};

/// Nearest Neighbor Interpolator.
///
/// Rounds each continuous index to the closest voxel. Never produces a value
/// that is not already present in the source volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest neighbor interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims(); // Z, Y, X
        let [x, y, z] = split_columns(indices);

        let x_i = x.round().clamp(0.0, (d2 - 1) as f64).int();
        let y_i = y.round().clamp(0.0, (d1 - 1) as f64).int();
        let z_i = z.round().clamp(0.0, (d0 - 1) as f64).int();

        let idx = z_i.mul_scalar((d1 * d2) as i64) + y_i.mul_scalar(d2 as i64) + x_i;
        let flat_data = data.clone().reshape([d0 * d1 * d2]);
        flat_data.gather(0, idx)
    }
}
