//! Intensity moments and principal axes of a volume.
//!
//! Voxel weights are intensities shifted so the darkest voxel weighs zero.
//! All quantities are in physical coordinates.

use burn::tensor::backend::Backend;
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use neuroprep_core::image::Image;
use neuroprep_core::spatial::Point3;
use crate::error::{RegistrationError, Result};

/// Zeroth, first and second intensity moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMoments {
    pub mass: f64,
    pub centroid: Point3,
    pub covariance: Matrix3<f64>,
}

/// Eigen-decomposition of a covariance, largest eigenvalue first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalAxes {
    pub values: Vector3<f64>,
    /// Unit eigenvectors as columns, matching `values`.
    pub vectors: Matrix3<f64>,
}

pub fn image_moments<B: Backend>(image: &Image<B, 3>) -> Result<ImageMoments> {
    let [nz, ny, nx] = image.shape();
    let values = image.to_values()?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(RegistrationError::numerical_instability("image contains non-finite intensities"));
    }
    let floor = values.iter().cloned().fold(f32::INFINITY, f32::min) as f64;

    let mut mass = 0.0;
    let mut first = Vector3::<f64>::zeros();
    let mut second = Matrix3::<f64>::zeros();
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let w = values[(z * ny + y) * nx + x] as f64 - floor;
                if w <= 0.0 {
                    continue;
                }
                let p = Vector3::new(x as f64, y as f64, z as f64);
                mass += w;
                first += p * w;
                second += p * p.transpose() * w;
            }
        }
    }
    if !(mass > 0.0) {
        return Err(RegistrationError::empty_image("volume has no intensity mass"));
    }

    // Index-space moments, then map through direction * diag(spacing).
    let mean = first / mass;
    let index_cov = second / mass - mean * mean.transpose();
    let linear = image.direction() * Matrix3::from_diagonal(image.spacing());
    let centroid = image.origin() + linear * mean;
    let covariance = linear * index_cov * linear.transpose();

    Ok(ImageMoments {
        mass,
        centroid,
        covariance,
    })
}

pub fn principal_axes(covariance: &Matrix3<f64>) -> PrincipalAxes {
    let symmetric = (covariance + covariance.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(symmetric);

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let values = Vector3::new(
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    );
    let vectors = Matrix3::from_columns(&[
        eigen.eigenvectors.column(order[0]).into_owned(),
        eigen.eigenvectors.column(order[1]).into_owned(),
        eigen.eigenvectors.column(order[2]).into_owned(),
    ]);
    PrincipalAxes { values, vectors }
}

impl PrincipalAxes {
    /// True when two eigenvalues are too close to tell their axes apart.
    pub fn is_ambiguous(&self, gap: f64) -> bool {
        let largest = self.values[0];
        if !(largest > 0.0) || self.values[2] < 0.0 {
            return true;
        }
        (self.values[0] - self.values[1]) / largest < gap || (self.values[1] - self.values[2]) / largest < gap
    }
}

/// Moving eigenvectors with signs matched to the fixed ones and a proper
/// rotation between the two frames.
fn matched_moving_axes(fixed: &PrincipalAxes, moving: &PrincipalAxes) -> Matrix3<f64> {
    let mut em = moving.vectors;
    for i in 0..3 {
        if em.column(i).dot(&fixed.vectors.column(i)) < 0.0 {
            em.set_column(i, &(-em.column(i)));
        }
    }
    if (em * fixed.vectors.transpose()).determinant() < 0.0 {
        // Flip the least reliable axis
        em.set_column(2, &(-em.column(2)));
    }
    em
}

/// Rotation taking the fixed principal frame onto the moving one.
///
/// Identity when either frame is ambiguous.
pub fn rotation_between(fixed: &PrincipalAxes, moving: &PrincipalAxes, gap: f64) -> Matrix3<f64> {
    if fixed.is_ambiguous(gap) || moving.is_ambiguous(gap) {
        return Matrix3::identity();
    }
    matched_moving_axes(fixed, moving) * fixed.vectors.transpose()
}

/// Linear map taking the fixed covariance onto the moving covariance.
///
/// Falls back to isotropic scaling by the trace ratio when the principal
/// frames are ambiguous.
pub fn linear_map_between(
    fixed: &ImageMoments,
    moving: &ImageMoments,
    gap: f64,
) -> Result<Matrix3<f64>> {
    let fixed_axes = principal_axes(&fixed.covariance);
    let moving_axes = principal_axes(&moving.covariance);

    if fixed_axes.is_ambiguous(gap) || moving_axes.is_ambiguous(gap) {
        let fixed_trace = fixed.covariance.trace();
        let moving_trace = moving.covariance.trace();
        if !(fixed_trace > 0.0) {
            // Single-voxel mass: no spread to match
            return Ok(Matrix3::identity());
        }
        let scale = (moving_trace.max(0.0) / fixed_trace).sqrt();
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(RegistrationError::numerical_instability(format!(
                "degenerate isotropic scale {scale}"
            )));
        }
        return Ok(Matrix3::identity() * scale);
    }

    let em = matched_moving_axes(&fixed_axes, &moving_axes);
    let scales = Vector3::from_fn(|i, _| (moving_axes.values[i] / fixed_axes.values[i]).sqrt());
    let map = em * Matrix3::from_diagonal(&scales) * fixed_axes.vectors.transpose();

    if map.iter().any(|v| !v.is_finite()) {
        return Err(RegistrationError::numerical_instability("non-finite affine matrix"));
    }
    Ok(map)
}
