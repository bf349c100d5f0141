//! Point mapping contract shared by every transform.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// A spatial mapping between two physical spaces.
///
/// Registration transforms map points of the fixed image into the moving
/// image, which is the direction resampling needs: each output voxel asks
/// where to read from.
pub trait Transform<B: Backend, const D: usize> {
    /// Map a batch of points.
    ///
    /// `points` has shape `[N, D]`, one `(x, y, z)` physical coordinate in
    /// millimetres per row. The result has the same shape.
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;
}
