//! Thirion demons on a fixed grid.
//!
//! Each iteration samples the moving image through `[field, affine]`, takes
//! the force `(f - m) ∇f / (|∇f|² + (f - m)² / K)` with `K` the mean squared
//! spacing, caps the step length and smooths the accumulated field.

use burn::tensor::{ElementConversion, Tensor};
use burn::tensor::backend::Backend;
use neuroprep_core::filter::GaussianFilter;
use neuroprep_core::image::{generate_grid_3d, Image};
use neuroprep_core::interpolation::{Interpolator, LinearInterpolator};
use neuroprep_core::spatial::SpacingExt;
use neuroprep_core::transform::{AffineTransform, DisplacementField, Transform, TransformChain};
use tracing::debug;
use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};

const DENOMINATOR_EPSILON: f32 = 1e-9;

/// Rescale a tensor to [0, 1]; a flat tensor maps to zeros.
fn unit_range<B: Backend>(data: Tensor<B, 3>) -> Tensor<B, 3> {
    let min = data.clone().min().into_scalar().elem::<f32>();
    let max = data.clone().max().into_scalar().elem::<f32>();
    if max > min {
        data.sub_scalar(min).div_scalar(max - min)
    } else {
        data.zeros_like()
    }
}

/// Central difference along a tensor axis, scaled by the physical step.
fn central_difference<B: Backend>(data: Tensor<B, 3>, dim: usize, step: f64) -> Tensor<B, 3> {
    let n = data.dims()[dim];
    if n < 2 {
        return data.zeros_like();
    }
    let first = data.clone().narrow(dim, 0, 1);
    let last = data.clone().narrow(dim, n - 1, 1);
    let padded = Tensor::cat(vec![first, data, last], dim);

    let forward = padded.clone().narrow(dim, 2, n);
    let backward = padded.narrow(dim, 0, n);
    (forward - backward).div_scalar(2.0 * step)
}

/// Physical-space gradient `(gx, gy, gz)` of an image.
pub fn physical_gradient<B: Backend>(image: &Image<B, 3>, data: &Tensor<B, 3>) -> [Tensor<B, 3>; 3] {
    let spacing = image.spacing();
    let direction = image.direction();
    // Index axis c (x, y, z) runs along tensor dim 2 - c.
    let index_grad: [Tensor<B, 3>; 3] =
        [0, 1, 2].map(|c| central_difference(data.clone(), 2 - c, spacing[c]));

    [0, 1, 2].map(|r| {
        index_grad[0].clone().mul_scalar(direction[(r, 0)])
            + index_grad[1].clone().mul_scalar(direction[(r, 1)])
            + index_grad[2].clone().mul_scalar(direction[(r, 2)])
    })
}

fn field_from<B: Backend>(components: &[Tensor<B, 3>; 3], fixed: &Image<B, 3>) -> DisplacementField<B> {
    let stacked = Tensor::stack::<4>(components.to_vec(), 0);
    DisplacementField::new(stacked, fixed.metadata())
}

fn sum_scalar<B: Backend, const D: usize>(t: Tensor<B, D>) -> f32 {
    t.sum().into_scalar().elem::<f32>()
}

/// Estimate a displacement field on the fixed grid.
///
/// The returned field maps fixed points to `x + u(x)`; `affine` then takes
/// them into moving space.
pub fn demons<B: Backend>(
    fixed: &Image<B, 3>,
    moving: &Image<B, 3>,
    affine: &AffineTransform<B, 3>,
    config: &RegistrationConfig,
) -> Result<DisplacementField<B>> {
    let device = fixed.data().device();
    let shape = fixed.shape();
    let voxels = fixed.num_voxels() as f32;

    let f = unit_range(fixed.data().clone());
    let moving_unit = moving.with_data(unit_range(moving.data().clone()));
    let gradient = physical_gradient(fixed, &f);
    let grad_sq = gradient
        .iter()
        .map(|g| g.clone().powf_scalar(2.0))
        .reduce(|a, b| a + b)
        .unwrap_or_else(|| f.zeros_like());

    let normalizer = fixed.spacing().mean_squared();
    let step_limit = config.max_step * fixed.spacing().min_spacing();
    let sigmas: Vec<f64> = (0..3).map(|i| config.field_sigma * fixed.spacing()[i]).collect();
    let smoother = GaussianFilter::<B>::new(sigmas);

    let points = fixed.index_to_world_tensor(generate_grid_3d::<B>(shape, &device));
    let interpolator = LinearInterpolator::new();
    let mut u: [Tensor<B, 3>; 3] = [0, 1, 2].map(|_| Tensor::zeros(shape, &device));

    for iteration in 0..config.demons_iterations {
        let chain = TransformChain::new(vec![field_from(&u, fixed).into(), affine.clone().into()]);
        let moved = chain.transform_points(points.clone());
        let indices = moving_unit.world_to_index_tensor(moved);
        let m = interpolator.interpolate(moving_unit.data(), indices).reshape(shape);

        let diff = f.clone() - m;
        let denominator = grad_sq.clone() + diff.clone().powf_scalar(2.0).div_scalar(normalizer);
        let valid = denominator.clone().greater_elem(DENOMINATOR_EPSILON).float();
        let speed = diff.clone() * valid / denominator.clamp_min(DENOMINATOR_EPSILON);

        let update: [Tensor<B, 3>; 3] = [0, 1, 2].map(|c| gradient[c].clone() * speed.clone());
        let length = update
            .iter()
            .map(|g| g.clone().powf_scalar(2.0))
            .reduce(|a, b| a + b)
            .unwrap_or_else(|| f.zeros_like())
            .sqrt();
        let damping = length.clamp_min(DENOMINATOR_EPSILON).recip().mul_scalar(step_limit).clamp_max(1.0);

        u = [0, 1, 2].map(|c| {
            let stepped = u[c].clone() + update[c].clone() * damping.clone();
            smoother.apply_tensor(stepped, fixed.spacing())
        });

        if iteration % 10 == 0 || iteration + 1 == config.demons_iterations {
            let mse = sum_scalar(diff.powf_scalar(2.0)) / voxels;
            debug!(iteration, mse, "demons iteration");
        }
    }

    let total: f32 = u.iter().map(|c| sum_scalar(c.clone().abs())).sum();
    if !total.is_finite() {
        return Err(RegistrationError::numerical_instability("displacement field is not finite"));
    }
    Ok(field_from(&u, fixed))
}
