//! Displacement field transform implementation.
//!
//! A dense field holding one physical displacement vector per voxel of a
//! sampling grid. Used for the deformable stage of registration.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use crate::image::{Image, ImageMetadata};
use crate::interpolation::{Interpolator, LinearInterpolator};
use super::trait_::Transform;

/// Dense displacement field transform for 3D volumes.
///
/// The displacement tensor has shape `[3, Z, Y, X]`; component 0 is the
/// x displacement in millimetres, component 2 the z displacement. The grid
/// metadata places the field voxels in physical space. Points falling
/// outside the grid take the displacement of the nearest edge voxel.
#[derive(Debug, Clone)]
pub struct DisplacementField<B: Backend> {
    displacement: Tensor<B, 4>,
    grid: ImageMetadata<3>,
}

impl<B: Backend> DisplacementField<B> {
    /// Create a new displacement field.
    ///
    /// # Arguments
    /// * `displacement` - Tensor of shape `[3, Z, Y, X]`
    /// * `grid` - Physical placement of the field voxels
    pub fn new(displacement: Tensor<B, 4>, grid: ImageMetadata<3>) -> Self {
        Self { displacement, grid }
    }

    /// Create a zero displacement field for the given spatial shape.
    pub fn zeros(shape: [usize; 3], grid: ImageMetadata<3>, device: &B::Device) -> Self {
        let displacement = Tensor::zeros([3, shape[0], shape[1], shape[2]], device);
        Self::new(displacement, grid)
    }

    /// Get the displacement field.
    pub fn displacement(&self) -> Tensor<B, 4> {
        self.displacement.clone()
    }

    /// Grid metadata of the field.
    pub fn grid(&self) -> &ImageMetadata<3> {
        &self.grid
    }

    /// Spatial shape `[Z, Y, X]` of the field.
    pub fn shape(&self) -> [usize; 3] {
        let [_, z, y, x] = self.displacement.dims();
        [z, y, x]
    }

    /// One displacement component as a volume on the field grid.
    pub fn component(&self, axis: usize) -> Image<B, 3> {
        let [z, y, x] = self.shape();
        let data = self.displacement.clone().narrow(0, axis, 1).reshape([z, y, x]);
        Image::from_metadata(data, self.grid)
    }
}

impl<B: Backend> Transform<B, 3> for DisplacementField<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let interpolator = LinearInterpolator::new();
        let x_component = self.component(0);
        let indices = x_component.world_to_index_tensor(points.clone());

        let dx = interpolator.interpolate(x_component.data(), indices.clone());
        let dy = interpolator.interpolate(self.component(1).data(), indices.clone());
        let dz = interpolator.interpolate(self.component(2).data(), indices);

        let offsets = Tensor::cat(
            vec![dx.unsqueeze_dim(1), dy.unsqueeze_dim(1), dz.unsqueeze_dim(1)],
            1,
        );
        points + offsets
    }
}
