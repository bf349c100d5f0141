//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Interpolator trait for sampling values at continuous coordinates.
///
/// Interpolators sample volume values at non-integer indices, which is what
/// resampling through a transform needs.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a volume at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - The source volume `[Z, Y, X]`
    /// * `indices` - The indices at which to interpolate, `[Batch, 3]` as `(x, y, z)`
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`. Indices outside the volume are
    /// clamped to the nearest edge voxel.
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Split `[Batch, 3]` indices into x, y and z columns.
pub(crate) fn split_columns<B: Backend>(indices: Tensor<B, 2>) -> [Tensor<B, 1>; 3] {
    let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
    let y = indices.clone().narrow(1, 1, 1).squeeze::<1>(1);
    let z = indices.narrow(1, 2, 1).squeeze::<1>(1);
    [x, y, z]
}
