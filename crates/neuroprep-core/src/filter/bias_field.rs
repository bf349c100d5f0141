//! Smooth multiplicative bias field estimation and removal.
//!
//! The field is modelled as a slowly varying gain over the foreground. It is
//! estimated on a shrunken copy of the volume by foreground-normalized
//! Gaussian smoothing, scaled to unit mean, resampled back to the full grid
//! and divided out.

use burn::tensor::{ElementConversion, Tensor};
use burn::tensor::backend::Backend;
use tracing::debug;
use crate::error::{CoreError, Result};
use crate::image::Image;
use crate::interpolation::LinearInterpolator;
use crate::transform::TranslationTransform;
use super::downsample::DownsampleFilter;
use super::gaussian::GaussianFilter;
use super::resample::ResampleImageFilter;

const FIELD_EPSILON: f32 = 1e-6;

/// Smooth-field bias corrector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothFieldCorrector {
    /// Gaussian sigma of the field model in millimetres.
    pub sigma_mm: f64,
    /// Voxels above this fraction of the maximum intensity are foreground.
    pub foreground_fraction: f32,
}

impl Default for SmoothFieldCorrector {
    fn default() -> Self {
        Self {
            sigma_mm: 20.0,
            foreground_fraction: 0.1,
        }
    }
}

impl SmoothFieldCorrector {
    pub fn new(sigma_mm: f64, foreground_fraction: f32) -> Self {
        Self { sigma_mm, foreground_fraction }
    }

    fn foreground<B: Backend>(&self, data: &Tensor<B, 3>, max: f32) -> Tensor<B, 3> {
        data.clone()
            .greater_elem(max * self.foreground_fraction)
            .float()
    }

    /// Estimate the bias field on the full grid of `image`.
    ///
    /// The field has unit mean over the shrunken foreground. A volume with no
    /// positive foreground gets a field of ones.
    pub fn estimate_field<B: Backend>(&self, image: &Image<B, 3>, shrink_factor: usize) -> Result<Tensor<B, 3>> {
        if !(self.sigma_mm > 0.0) {
            return Err(CoreError::InvalidParameter(format!("bias sigma must be positive, got {}", self.sigma_mm)));
        }
        if image.num_voxels() == 0 {
            return Err(CoreError::EmptyImage);
        }
        let shrink_factor = shrink_factor.max(1);
        let device = image.data().device();

        let small = DownsampleFilter::new(vec![shrink_factor]).apply(image);
        let max = small.data().clone().max().into_scalar().elem::<f32>();
        if !max.is_finite() || max <= 0.0 {
            debug!(max, "no positive foreground, skipping bias estimation");
            return Ok(Tensor::ones(image.shape(), &device));
        }

        let mask = self.foreground(small.data(), max);
        let count = mask.clone().sum().into_scalar().elem::<f32>();
        if count < 1.0 {
            return Ok(Tensor::ones(image.shape(), &device));
        }

        let smoother = GaussianFilter::<B>::new(vec![self.sigma_mm]).with_max_kernel_width(65);
        let numerator = smoother.apply_tensor(small.data().clone() * mask.clone(), small.spacing());
        let denominator = smoother.apply_tensor(mask.clone(), small.spacing());

        let valid = denominator.clone().greater_elem(FIELD_EPSILON).float();
        let ratio = numerator / denominator.clamp_min(FIELD_EPSILON);
        let fg_mean = (small.data().clone() * mask.clone()).sum().into_scalar().elem::<f32>() / count;
        let field = ratio * valid.clone() + (valid.neg() + 1.0).mul_scalar(fg_mean);

        let field_mean = (field.clone() * mask).sum().into_scalar().elem::<f32>() / count;
        if !field_mean.is_finite() || field_mean <= 0.0 {
            return Err(CoreError::InvalidParameter(format!(
                "bias field mean is not positive: {field_mean}"
            )));
        }
        let field = small.with_data(field.div_scalar(field_mean));
        debug!(
            shrunk = ?field.shape(),
            fg_mean,
            field_mean,
            "estimated bias field"
        );

        let full = ResampleImageFilter::new_from_reference(
            image,
            TranslationTransform::<B, 3>::identity(&device),
            LinearInterpolator::new(),
        )
        .with_default_pixel_value(1.0)
        .apply(&field);

        Ok(full.into_data())
    }

    /// Divide the estimated field out of the foreground.
    ///
    /// Background voxels are left as they are. Returns the bare corrected
    /// array on the input grid.
    pub fn correct<B: Backend>(&self, image: &Image<B, 3>, shrink_factor: usize) -> Result<Tensor<B, 3>> {
        let field = self.estimate_field(image, shrink_factor)?;
        let data = image.data().clone();

        let max = data.clone().max().into_scalar().elem::<f32>();
        if !max.is_finite() || max <= 0.0 {
            return Ok(data);
        }
        let mask = self.foreground(&data, max);
        let gain = mask.clone() / field.clamp_min(FIELD_EPSILON) + (mask.neg() + 1.0);
        let corrected = data * gain;

        let check = corrected.clone().sum().into_scalar().elem::<f32>();
        if !check.is_finite() {
            return Err(CoreError::InvalidParameter("bias correction produced non-finite values".to_string()));
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::image::ImageMetadata;

    type TestBackend = NdArray<f32>;

    fn ramp_image(n: usize) -> Image<TestBackend, 3> {
        // Constant tissue of 100 under a gain that rises along x
        let mut values = Vec::with_capacity(n * n * n);
        for _z in 0..n {
            for _y in 0..n {
                for x in 0..n {
                    values.push(100.0 * (1.0 + 0.5 * x as f32 / (n - 1) as f32));
                }
            }
        }
        Image::from_values(values, [n, n, n], ImageMetadata::default(), &Default::default()).unwrap()
    }

    fn spread(values: &[f32]) -> f32 {
        let max = values.iter().cloned().fold(f32::MIN, f32::max);
        let min = values.iter().cloned().fold(f32::MAX, f32::min);
        max - min
    }

    #[test]
    fn test_correct_keeps_shape() {
        let image = ramp_image(8);
        let corrected = SmoothFieldCorrector::default().correct(&image, 2).unwrap();
        assert_eq!(corrected.dims(), [8, 8, 8]);
    }

    #[test]
    fn test_correction_flattens_gain() {
        let image = ramp_image(12);
        let before = image.to_values().unwrap();
        let corrector = SmoothFieldCorrector::new(3.0, 0.1);
        let corrected = corrector.correct(&image, 2).unwrap();
        let after = corrected.into_data().convert::<f32>().to_vec::<f32>().unwrap();

        assert!(spread(&after) < spread(&before));
    }

    #[test]
    fn test_zero_volume_is_unchanged() {
        let image = Image::<TestBackend, 3>::from_values(vec![0.0; 27], [3, 3, 3], ImageMetadata::default(), &Default::default()).unwrap();
        let corrected = SmoothFieldCorrector::default().correct(&image, 2).unwrap();
        let values = corrected.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_invalid_sigma() {
        let image = ramp_image(4);
        let corrector = SmoothFieldCorrector::new(0.0, 0.1);
        assert!(matches!(corrector.correct(&image, 2), Err(CoreError::InvalidParameter(_))));
    }
}
