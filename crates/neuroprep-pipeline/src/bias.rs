//! Bias-field correction adapter.
//!
//! Correction engines hand back a bare array. [`correct_bias`] re-attaches
//! the input's origin, spacing and direction so nothing downstream sees an
//! image with lost geometry.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use neuroprep_core::filter::SmoothFieldCorrector;
use neuroprep_core::image::Image;
use tracing::debug;
use crate::error::BiasCorrectionError;

/// A bias-field correction engine.
pub trait BiasFieldCorrector<B: Backend>: Send + Sync {
    /// Return corrected intensities on the same voxel grid as `image`.
    fn correct(&self, image: &Image<B, 3>, shrink_factor: usize) -> Result<Tensor<B, 3>, BiasCorrectionError>;
}

impl<B: Backend> BiasFieldCorrector<B> for SmoothFieldCorrector {
    fn correct(&self, image: &Image<B, 3>, shrink_factor: usize) -> Result<Tensor<B, 3>, BiasCorrectionError> {
        Ok(SmoothFieldCorrector::correct(self, image, shrink_factor)?)
    }
}

/// Run `corrector` and rebuild a spatial image from its output.
pub fn correct_bias<B: Backend, C: BiasFieldCorrector<B> + ?Sized>(
    corrector: &C,
    image: &Image<B, 3>,
    shrink_factor: usize,
) -> Result<Image<B, 3>, BiasCorrectionError> {
    let corrected = corrector.correct(image, shrink_factor)?;
    let expected = image.shape();
    let actual = corrected.dims();
    if actual != expected {
        return Err(BiasCorrectionError::ShapeChanged { expected, actual });
    }
    debug!(shrink_factor, "bias field corrected");
    Ok(image.with_data(corrected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use neuroprep_core::image::ImageMetadata;
    use neuroprep_core::spatial::{Direction3, Point3, Spacing3};

    type TestBackend = NdArray<f32>;

    struct Halving;

    impl BiasFieldCorrector<TestBackend> for Halving {
        fn correct(&self, image: &Image<TestBackend, 3>, _shrink: usize) -> Result<Tensor<TestBackend, 3>, BiasCorrectionError> {
            Ok(image.data().clone().div_scalar(2.0))
        }
    }

    struct Cropping;

    impl BiasFieldCorrector<TestBackend> for Cropping {
        fn correct(&self, image: &Image<TestBackend, 3>, _shrink: usize) -> Result<Tensor<TestBackend, 3>, BiasCorrectionError> {
            Ok(image.data().clone().narrow(0, 0, 1))
        }
    }

    fn oblique_image() -> Image<TestBackend, 3> {
        let metadata = ImageMetadata::new(
            Point3::new(-10.0, 4.0, 2.5),
            Spacing3::new(0.8, 1.0, 1.2),
            Direction3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
        );
        let values: Vec<f32> = (0..24).map(|v| v as f32 + 1.0).collect();
        Image::from_values(values, [2, 3, 4], metadata, &Default::default()).unwrap()
    }

    #[test]
    fn test_metadata_reattached() {
        let image = oblique_image();
        let corrected = correct_bias(&Halving, &image, 2).unwrap();

        assert!(corrected.metadata().approx_eq(&image.metadata(), 0.0));
        assert_eq!(corrected.to_values().unwrap()[3], 2.0);
    }

    #[test]
    fn test_shape_change_rejected() {
        let err = correct_bias(&Cropping, &oblique_image(), 2).unwrap_err();
        assert!(matches!(err, BiasCorrectionError::ShapeChanged { expected: [2, 3, 4], actual: [1, 3, 4] }));
    }

    #[test]
    fn test_smooth_field_keeps_geometry() {
        let image = oblique_image();
        let corrected = correct_bias(&SmoothFieldCorrector::default(), &image, 2).unwrap();

        assert_eq!(corrected.shape(), image.shape());
        assert!(corrected.same_grid(&image));
    }
}
