//! Built-in registration engine.
//!
//! Linear stages are solved in closed form from intensity moments: centroids
//! give the translation, principal axes the rotation and covariances the
//! full linear map. The deformable stage refines the affine result with
//! demons.

use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;
use nalgebra::Matrix3;
use neuroprep_core::filter::apply_transforms;
use neuroprep_core::image::Image;
use neuroprep_core::interpolation::Interpolation;
use neuroprep_core::transform::{AffineTransform, TransformChain, TranslationTransform};
use tracing::debug;
use crate::config::RegistrationConfig;
use crate::demons::demons;
use crate::engine::{RegistrationEngine, RegistrationOutput, TransformKind};
use crate::error::{RegistrationError, Result};
use crate::moments::{image_moments, linear_map_between, principal_axes, rotation_between, ImageMoments};

/// Moments-and-demons registration engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentsDemonsEngine {
    config: RegistrationConfig,
}

impl MomentsDemonsEngine {
    /// Create an engine, rejecting invalid configuration.
    pub fn new(config: RegistrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// `x -> A (x - c_f) + c_m`
    fn centered_affine<B: Backend>(
        matrix: &Matrix3<f64>,
        fixed: &ImageMoments,
        moving: &ImageMoments,
        device: &B::Device,
    ) -> AffineTransform<B, 3> {
        let translation = moving.centroid - fixed.centroid;
        AffineTransform::from_parts(matrix, &translation, &fixed.centroid, device)
    }

    fn linear_chain<B: Backend>(
        &self,
        kind: TransformKind,
        fixed: &ImageMoments,
        moving: &ImageMoments,
        device: &B::Device,
    ) -> Result<(TransformChain<B>, Option<AffineTransform<B, 3>>)> {
        let gap = self.config.eigen_gap;
        match kind {
            TransformKind::Translation => {
                let offset = moving.centroid - fixed.centroid;
                debug!(offset = ?offset.as_slice(), "translation from centroids");
                let chain = TransformChain::identity().then(TranslationTransform::<B, 3>::from_vector(&offset, device));
                Ok((chain, None))
            }
            TransformKind::Rigid => {
                let rotation = rotation_between(
                    &principal_axes(&fixed.covariance),
                    &principal_axes(&moving.covariance),
                    gap,
                );
                debug!(rotation = ?rotation.as_slice(), "rotation from principal axes");
                let affine = Self::centered_affine::<B>(&rotation, fixed, moving, device);
                Ok((TransformChain::identity().then(affine.clone()), Some(affine)))
            }
            TransformKind::Affine | TransformKind::SyN => {
                let matrix = linear_map_between(fixed, moving, gap)?;
                debug!(matrix = ?matrix.as_slice(), "linear map from covariances");
                let affine = Self::centered_affine::<B>(&matrix, fixed, moving, device);
                Ok((TransformChain::identity().then(affine.clone()), Some(affine)))
            }
        }
    }
}

impl<B: Backend> RegistrationEngine<B> for MomentsDemonsEngine {
    fn register(
        &self,
        fixed: &Image<B, 3>,
        moving: &Image<B, 3>,
        kind: TransformKind,
    ) -> Result<RegistrationOutput<B>> {
        let device = fixed.data().device();
        let fixed_moments = image_moments(fixed)
            .map_err(|e| RegistrationError::engine(format!("fixed image: {e}")))?;
        let moving_moments = image_moments(moving)
            .map_err(|e| RegistrationError::engine(format!("moving image: {e}")))?;

        let (mut chain, affine) = self.linear_chain::<B>(kind, &fixed_moments, &moving_moments, &device)?;

        if kind == TransformKind::SyN {
            let affine = affine.ok_or_else(|| RegistrationError::engine("deformable stage needs an affine start"))?;
            let field = demons(fixed, moving, &affine, &self.config)?;
            chain = TransformChain::identity().then(field).then(affine);
        }

        let warped_moving = apply_transforms(moving, fixed, chain.clone(), Interpolation::Linear);
        let check = warped_moving.data().clone().sum().into_scalar().elem::<f32>();
        if !check.is_finite() {
            return Err(RegistrationError::numerical_instability(format!(
                "{kind} registration produced non-finite intensities"
            )));
        }

        Ok(RegistrationOutput {
            warped_moving,
            forward_transforms: chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use neuroprep_core::image::ImageMetadata;

    type TestBackend = NdArray<f32>;

    fn ellipsoid(n: usize, center: [f64; 3], radii: [f64; 3]) -> Image<TestBackend, 3> {
        let mut values = Vec::with_capacity(n * n * n);
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let d = ((x as f64 - center[0]) / radii[0]).powi(2)
                        + ((y as f64 - center[1]) / radii[1]).powi(2)
                        + ((z as f64 - center[2]) / radii[2]).powi(2);
                    values.push((-d).exp() as f32);
                }
            }
        }
        Image::from_values(values, [n, n, n], ImageMetadata::default(), &Default::default()).unwrap()
    }

    #[test]
    fn test_translation_aligns_centroids() {
        let fixed = ellipsoid(16, [7.5, 7.5, 7.5], [2.0, 1.5, 1.8]);
        let moving = ellipsoid(16, [9.0, 6.5, 7.5], [2.0, 1.5, 1.8]);
        let engine = MomentsDemonsEngine::default();

        let output = RegistrationEngine::<TestBackend>::register(&engine, &fixed, &moving, TransformKind::Translation).unwrap();
        let aligned = image_moments(&output.warped_moving).unwrap();
        let target = image_moments(&fixed).unwrap();

        assert_eq!(output.forward_transforms.len(), 1);
        assert!((aligned.centroid - target.centroid).norm() < 0.25);
        assert_eq!(output.warped_moving.metadata(), fixed.metadata());
    }

    #[test]
    fn test_syn_chain_layout() {
        let fixed = ellipsoid(12, [5.5, 5.5, 5.5], [3.0, 2.0, 2.5]);
        let moving = ellipsoid(12, [6.0, 5.5, 5.5], [3.0, 2.2, 2.5]);
        let engine = MomentsDemonsEngine::new(RegistrationConfig::default().with_demons_iterations(3)).unwrap();

        let output = RegistrationEngine::<TestBackend>::register(&engine, &fixed, &moving, TransformKind::SyN).unwrap();
        let kinds: Vec<&str> = output.forward_transforms.links().iter().map(|l| l.kind()).collect();

        assert_eq!(kinds, vec!["displacement_field", "affine"]);
        assert_eq!(output.warped_moving.shape(), fixed.shape());
    }

    #[test]
    fn test_flat_moving_image_fails() {
        let fixed = ellipsoid(8, [3.5, 3.5, 3.5], [2.0, 2.0, 2.0]);
        let flat = Image::<TestBackend, 3>::from_values(vec![1.0; 512], [8, 8, 8], ImageMetadata::default(), &Default::default()).unwrap();
        let engine = MomentsDemonsEngine::default();

        let result = RegistrationEngine::<TestBackend>::register(&engine, &fixed, &flat, TransformKind::Rigid);
        assert!(matches!(result, Err(RegistrationError::Engine(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(MomentsDemonsEngine::new(RegistrationConfig::default().with_max_step(-1.0)).is_err());
    }
}
