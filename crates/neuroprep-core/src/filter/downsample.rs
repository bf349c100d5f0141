//! Integer-factor downsampling.

use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use crate::image::Image;

/// Downsample filter.
///
/// Reduces the image size by integer factors by keeping every Nth voxel.
/// Factors are ordered `(x, y, z)` like spacing; a single factor applies to
/// every axis. The first voxel keeps its physical position, so the origin is
/// unchanged and spacing grows by the factor.
#[derive(Debug, Clone)]
pub struct DownsampleFilter<B: Backend> {
    factors: Vec<usize>,
    _b: std::marker::PhantomData<B>,
}

impl<B: Backend> DownsampleFilter<B> {
    /// Create a new downsample filter.
    ///
    /// # Arguments
    /// * `factors` - Downsampling factor for each axis (values below 2 leave the axis alone).
    pub fn new(factors: Vec<usize>) -> Self {
        Self {
            factors,
            _b: std::marker::PhantomData,
        }
    }

    /// Apply the filter to an image.
    pub fn apply<const D: usize>(&self, image: &Image<B, D>) -> Image<B, D> {
        let mut data = image.data().clone();
        let device = data.device();
        let dims: [usize; D] = data.dims();
        let mut new_spacing = *image.spacing();

        for dim in 0..D {
            let axis = D - 1 - dim;
            let factor = self.factors.get(axis).or(self.factors.first()).copied().unwrap_or(1);
            if factor <= 1 {
                continue;
            }

            // size 10, factor 2 keeps 0, 2, 4, 6, 8
            let kept: Vec<i64> = (0..dims[dim]).step_by(factor).map(|i| i as i64).collect();
            let indices = Tensor::<B, 1, Int>::from_ints(kept.as_slice(), &device);
            data = data.select(dim, indices);

            new_spacing[axis] *= factor as f64;
        }

        Image::new(data, *image.origin(), new_spacing, *image.direction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::image::ImageMetadata;
    use crate::spatial::{Direction3, Point3, Spacing3};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_downsample_shape_and_spacing() {
        let device = Default::default();
        let metadata = ImageMetadata::new(
            Point3::new(1.0, 2.0, 3.0),
            Spacing3::new(1.0, 2.0, 3.0),
            Direction3::identity(),
        );
        let image = Image::<TestBackend, 3>::from_values(vec![0.0; 4 * 5 * 6], [4, 5, 6], metadata, &device).unwrap();

        let small = DownsampleFilter::new(vec![2]).apply(&image);

        assert_eq!(small.shape(), [2, 3, 3]);
        assert_eq!(small.spacing(), &Spacing3::new(2.0, 4.0, 6.0));
        assert_eq!(small.origin(), image.origin());
    }

    #[test]
    fn test_downsample_per_axis_factor() {
        let device = Default::default();
        let values: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let image = Image::<TestBackend, 3>::from_values(values, [1, 1, 8], ImageMetadata::default(), &device).unwrap();

        // Only x is reduced; x is the last tensor axis
        let small = DownsampleFilter::new(vec![4, 1, 1]).apply(&image);

        assert_eq!(small.shape(), [1, 1, 2]);
        assert_eq!(small.to_values().unwrap(), vec![0.0, 4.0]);
        assert_eq!(small.spacing()[0], 4.0);
        assert_eq!(small.spacing()[2], 1.0);
    }
}
