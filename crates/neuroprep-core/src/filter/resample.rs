//! Resample image filter.
//!
//! This module provides ResampleImageFilter which resamples an image
//! onto a new grid using a transform and an interpolator, and
//! [`apply_transforms`], the entry point used to push an image through a
//! registration's transform chain.

use std::marker::PhantomData;
use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::image::{generate_grid_3d, Image, ImageMetadata};
use crate::interpolation::{Interpolation, Interpolator, LinearInterpolator, NearestNeighborInterpolator};
use crate::transform::{Transform, TransformChain};

/// Resample image filter.
///
/// Resamples an image by applying a transform to map points from the
/// output image space to the input image space, and then interpolating values.
///
/// The transform maps from Output Physical Space -> Input Physical Space,
/// which is the direction a registration's forward chain (fixed -> moving)
/// already points. Output voxels whose source lies outside the input volume
/// (more than half a voxel past its edge) take the default value.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `T` - The transform type
/// * `I` - The interpolator type
pub struct ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    size: [usize; 3],
    metadata: ImageMetadata<3>,
    transform: T,
    interpolator: I,
    default_pixel_value: f64,
    _phantom: PhantomData<B>,
}

impl<B, T, I> ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    /// Create a new resample filter.
    ///
    /// # Arguments
    /// * `size` - Output image size `[Z, Y, X]`
    /// * `metadata` - Output grid origin, spacing and direction
    /// * `transform` - Transform from output space to input space
    /// * `interpolator` - Interpolator for input image sampling
    pub fn new(size: [usize; 3], metadata: ImageMetadata<3>, transform: T, interpolator: I) -> Self {
        Self {
            size,
            metadata,
            transform,
            interpolator,
            default_pixel_value: 0.0,
            _phantom: PhantomData,
        }
    }

    /// Set default pixel value for outside the field of view.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Create from a reference image.
    ///
    /// Uses size and metadata of the reference image as the output grid.
    pub fn new_from_reference(reference: &Image<B, 3>, transform: T, interpolator: I) -> Self {
        Self::new(reference.shape(), reference.metadata(), transform, interpolator)
    }

    /// Apply filter to an input image.
    pub fn apply(&self, input: &Image<B, 3>) -> Image<B, 3> {
        let device = input.data().device();

        let output_indices = generate_grid_3d::<B>(self.size, &device);
        let output_points = self.indices_to_physical(output_indices, &device);
        let input_points = self.transform.transform_points(output_points);
        let input_indices = input.world_to_index_tensor(input_points);

        let inside = Self::inside_mask(input.shape(), input_indices.clone());
        let sampled = self.interpolator.interpolate(input.data(), input_indices);

        let outside = inside.clone().neg() + 1.0;
        let values = sampled * inside + outside.mul_scalar(self.default_pixel_value);

        Image::from_metadata(values.reshape(self.size), self.metadata)
    }

    /// 1.0 where a continuous index lies within half a voxel of the volume.
    fn inside_mask(shape: [usize; 3], indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = shape;
        // Column 0 is x, which runs along the last tensor axis.
        let extents = [d2, d1, d0];

        extents
            .iter()
            .enumerate()
            .map(|(col, &extent)| {
                let c = indices.clone().narrow(1, col, 1).squeeze::<1>(1);
                let above = c.clone().greater_equal_elem(-0.5).float();
                let below = c.lower_equal_elem(extent as f64 - 0.5).float();
                above * below
            })
            .reduce(|acc, m| acc * m)
            .unwrap_or_else(|| Tensor::ones([indices.dims()[0]], &indices.device()))
    }

    fn indices_to_physical(&self, indices: Tensor<B, 2>, device: &B::Device) -> Tensor<B, 2> {
        // point = origin + Direction * (index * spacing)
        let origin = self.metadata.origin();
        let spacing = self.metadata.spacing();
        let direction = self.metadata.direction();

        let origin_vec: Vec<f32> = (0..3).map(|i| origin[i] as f32).collect();
        let origin_tensor = Tensor::<B, 2>::from_data(
            TensorData::new(origin_vec, [1, 3]).convert::<B::FloatElem>(),
            device,
        );

        let spacing_vec: Vec<f32> = (0..3).map(|i| spacing[i] as f32).collect();
        let spacing_tensor = Tensor::<B, 2>::from_data(
            TensorData::new(spacing_vec, [1, 3]).convert::<B::FloatElem>(),
            device,
        );

        // Row vectors: multiply by Direction^T
        let mut dir_data = Vec::with_capacity(9);
        for c in 0..3 {
            for r in 0..3 {
                dir_data.push(direction[(r, c)] as f32);
            }
        }
        let dir_t_tensor = Tensor::<B, 2>::from_data(
            TensorData::new(dir_data, [3, 3]).convert::<B::FloatElem>(),
            device,
        );

        (indices * spacing_tensor).matmul(dir_t_tensor) + origin_tensor
    }
}

/// Resample `moving` onto the grid of `reference` through `chain`.
///
/// The chain maps reference (fixed) physical points into moving space and is
/// consumed. Voxels that map outside the moving volume are zero. Nearest
/// neighbor interpolation never introduces values absent from `moving`, which
/// keeps binary masks binary.
pub fn apply_transforms<B: Backend>(
    moving: &Image<B, 3>,
    reference: &Image<B, 3>,
    chain: TransformChain<B>,
    interpolation: Interpolation,
) -> Image<B, 3> {
    tracing::debug!(
        links = chain.len(),
        %interpolation,
        "resampling through transform chain"
    );
    match interpolation {
        Interpolation::Linear => {
            ResampleImageFilter::new_from_reference(reference, chain, LinearInterpolator::new()).apply(moving)
        }
        Interpolation::NearestNeighbor => {
            ResampleImageFilter::new_from_reference(reference, chain, NearestNeighborInterpolator::new())
                .apply(moving)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::spatial::{Direction3, Point3, Spacing3, Vector};
    use crate::transform::TranslationTransform;

    type TestBackend = NdArray<f32>;

    fn square_image() -> Image<TestBackend, 3> {
        let device = Default::default();
        // 1 x 10 x 10 with a 2x2 square at (x, y) in {4, 5}
        let mut data = vec![0.0f32; 100];
        data[4 * 10 + 4] = 1.0;
        data[4 * 10 + 5] = 1.0;
        data[5 * 10 + 4] = 1.0;
        data[5 * 10 + 5] = 1.0;
        Image::from_values(data, [1, 10, 10], ImageMetadata::default(), &device).unwrap()
    }

    #[test]
    fn test_resample_translation() {
        let device = Default::default();
        let image = square_image();

        // Output point p samples the input at p - (2, 1, 0): content moves by +2 in x, +1 in y
        let transform = TranslationTransform::<TestBackend, 3>::from_vector(&Vector::<3>::new(-2.0, -1.0, 0.0), &device);
        let filter = ResampleImageFilter::new_from_reference(&image, transform, LinearInterpolator::new());
        let slice = filter.apply(&image).to_values().unwrap();

        assert!(slice[5 * 10 + 6] > 0.9);
        assert!(slice[5 * 10 + 7] > 0.9);
        assert!(slice[6 * 10 + 6] > 0.9);
        assert!(slice[6 * 10 + 7] > 0.9);
        assert!(slice[4 * 10 + 4] < 0.1);
    }

    #[test]
    fn test_outside_field_of_view_uses_default() {
        let device = Default::default();
        let image = Image::<TestBackend, 3>::from_values(vec![3.0; 10], [1, 1, 10], ImageMetadata::default(), &device).unwrap();

        let transform = TranslationTransform::<TestBackend, 3>::from_vector(&Vector::<3>::new(5.0, 0.0, 0.0), &device);
        let filter = ResampleImageFilter::new_from_reference(&image, transform, NearestNeighborInterpolator::new())
            .with_default_pixel_value(-1.0);
        let out = filter.apply(&image).to_values().unwrap();

        // Sources 5..=9 are inside, 10..=14 are not
        assert_eq!(&out[..5], &[3.0; 5]);
        assert_eq!(&out[5..], &[-1.0; 5]);
    }

    #[test]
    fn test_output_takes_reference_grid() {
        let device = Default::default();
        let moving = square_image();
        let reference_metadata = ImageMetadata::new(
            Point3::new(0.0, 0.0, 0.0),
            Spacing3::new(2.0, 2.0, 1.0),
            Direction3::identity(),
        );
        let reference = Image::<TestBackend, 3>::from_values(vec![0.0; 25], [1, 5, 5], reference_metadata, &device).unwrap();

        let out = apply_transforms(&moving, &reference, TransformChain::identity(), Interpolation::NearestNeighbor);

        assert_eq!(out.shape(), [1, 5, 5]);
        assert_eq!(out.metadata(), reference_metadata);
        // Reference voxel (2, 2) sits at physical (4, 4), inside the square
        assert_eq!(out.to_values().unwrap()[2 * 5 + 2], 1.0);
    }
}
