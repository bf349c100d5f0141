//! Intensity transforms: percentile clipping, min-max rescaling and masking.
//!
//! All operations keep the input's origin, spacing and direction.

use burn::tensor::backend::Backend;
use tracing::debug;
use crate::error::{CoreError, Result};
use crate::image::Image;

/// Default lower percentile for [`winsorize`].
pub const DEFAULT_LOWER_PERCENTILE: f64 = 1.0;
/// Default upper percentile for [`winsorize`].
pub const DEFAULT_UPPER_PERCENTILE: f64 = 99.0;

/// Intensity values at a pair of percentiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityBounds {
    pub lower: f32,
    pub upper: f32,
}

/// Percentile of `values` with linear interpolation between closest ranks.
///
/// The rank of `p` is `p / 100 * (n - 1)` over the ascending values. NaN
/// values are ignored.
pub fn percentile(values: &[f32], p: f64) -> Result<f32> {
    if !(0.0..=100.0).contains(&p) {
        return Err(CoreError::InvalidPercentiles { lower: p, upper: p });
    }
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(CoreError::EmptyImage);
    }
    sorted.sort_unstable_by(f32::total_cmp);
    Ok(percentile_of_sorted(&sorted, p))
}

fn percentile_of_sorted(sorted: &[f32], p: f64) -> f32 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    let (a, b) = (sorted[lo] as f64, sorted[hi] as f64);
    (a + (b - a) * frac) as f32
}

fn validate_percentiles(lower: f64, upper: f64) -> Result<()> {
    let valid = lower.is_finite() && upper.is_finite() && 0.0 <= lower && lower < upper && upper <= 100.0;
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidPercentiles { lower, upper })
    }
}

/// Intensities at the `lower` and `upper` percentiles over all voxels.
pub fn percentile_bounds<B: Backend>(image: &Image<B, 3>, lower: f64, upper: f64) -> Result<IntensityBounds> {
    validate_percentiles(lower, upper)?;
    let mut values = image.to_values()?;
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return Err(CoreError::EmptyImage);
    }
    values.sort_unstable_by(f32::total_cmp);

    Ok(IntensityBounds {
        lower: percentile_of_sorted(&values, lower),
        upper: percentile_of_sorted(&values, upper),
    })
}

/// Clip every voxel into the `[lower, upper]` percentile range of the input.
///
/// Voxels already inside the range are returned unchanged.
pub fn winsorize<B: Backend>(image: &Image<B, 3>, lower: f64, upper: f64) -> Result<Image<B, 3>> {
    let bounds = percentile_bounds(image, lower, upper)?;
    debug!(lower = bounds.lower, upper = bounds.upper, "winsorizing intensities");

    let clipped = image.data().clone().clamp(bounds.lower, bounds.upper);
    Ok(image.with_data(clipped))
}

/// Linearly rescale intensities so the minimum becomes 0 and the maximum 1.
///
/// Fails with [`CoreError::DegenerateNormalization`] on a flat volume or when
/// any voxel is non-finite.
pub fn normalize<B: Backend>(image: &Image<B, 3>) -> Result<Image<B, 3>> {
    let values = image.to_values()?;
    if values.is_empty() {
        return Err(CoreError::EmptyImage);
    }

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut finite = true;
    for &v in &values {
        finite &= v.is_finite();
        min = min.min(v);
        max = max.max(v);
    }
    if !finite || !(max > min) {
        return Err(CoreError::DegenerateNormalization { min, max });
    }

    let range = max - min;
    let scaled = image
        .data()
        .clone()
        .sub_scalar(min)
        .div_scalar(range)
        .clamp(0.0, 1.0);
    Ok(image.with_data(scaled))
}

/// Voxel-wise product of `image` and `mask`; the result keeps the image's metadata.
pub fn mask_image<B: Backend>(image: &Image<B, 3>, mask: &Image<B, 3>) -> Result<Image<B, 3>> {
    if image.shape() != mask.shape() {
        return Err(CoreError::ShapeMismatch {
            expected: image.shape().to_vec(),
            actual: mask.shape().to_vec(),
        });
    }
    let product = image.data().clone() * mask.data().clone();
    Ok(image.with_data(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::image::ImageMetadata;

    type TestBackend = NdArray<f32>;

    fn image_from(values: Vec<f32>, shape: [usize; 3]) -> Image<TestBackend, 3> {
        Image::from_values(values, shape, ImageMetadata::default(), &Default::default()).unwrap()
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&values, 50.0).unwrap(), 3.0);
        assert_eq!(percentile(&values, 100.0).unwrap(), 5.0);
        // rank 0.1 * 4 = 0.4
        assert!((percentile(&values, 10.0).unwrap() - 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let values = [9.0, 1.0, 5.0];
        assert_eq!(percentile(&values, 50.0).unwrap(), 5.0);
    }

    #[test]
    fn test_invalid_percentiles_rejected() {
        let image = image_from(vec![1.0, 2.0], [1, 1, 2]);
        assert!(matches!(
            winsorize(&image, 99.0, 1.0),
            Err(CoreError::InvalidPercentiles { .. })
        ));
        assert!(matches!(
            winsorize(&image, -1.0, 50.0),
            Err(CoreError::InvalidPercentiles { .. })
        ));
    }

    #[test]
    fn test_winsorize_clips_outliers() {
        let mut values: Vec<f32> = (0..101).map(|v| v as f32).collect();
        values[100] = 10_000.0;
        let image = image_from(values, [1, 1, 101]);

        let out = winsorize(&image, 1.0, 99.0).unwrap().to_values().unwrap();
        assert_eq!(out[0], 1.0);
        assert_eq!(out[50], 50.0);
        assert_eq!(out[100], 99.0);
    }

    #[test]
    fn test_normalize_exact_bounds() {
        let image = image_from(vec![-3.0, 0.5, 7.0, 2.0], [1, 2, 2]);
        let out = normalize(&image).unwrap().to_values().unwrap();

        assert_eq!(out[0], 0.0);
        assert_eq!(out[2], 1.0);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_normalize_flat_volume_is_degenerate() {
        let image = image_from(vec![4.0; 8], [2, 2, 2]);
        assert_eq!(
            normalize(&image).unwrap_err(),
            CoreError::DegenerateNormalization { min: 4.0, max: 4.0 }
        );
    }

    #[test]
    fn test_normalize_rejects_nan() {
        let image = image_from(vec![0.0, f32::NAN, 1.0], [1, 1, 3]);
        assert!(matches!(normalize(&image), Err(CoreError::DegenerateNormalization { .. })));
    }

    #[test]
    fn test_mask_image() {
        let image = image_from(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]);
        let mask = image_from(vec![1.0, 0.0, 0.0, 1.0], [1, 2, 2]);
        let out = mask_image(&image, &mask).unwrap().to_values().unwrap();
        assert_eq!(out, vec![1.0, 0.0, 0.0, 4.0]);

        let wrong = image_from(vec![1.0; 2], [1, 1, 2]);
        assert!(matches!(mask_image(&image, &wrong), Err(CoreError::ShapeMismatch { .. })));
    }
}
