//! Helpers for voxel spacing vectors.

use super::Spacing;

/// Convenience operations on [`Spacing`].
pub trait SpacingExt {
    /// Same spacing along every axis.
    fn uniform(value: f64) -> Self;
    /// Check if spacing is uniform (all components equal).
    fn is_uniform(&self) -> bool;
    /// Smallest component.
    fn min_spacing(&self) -> f64;
    /// Largest component.
    fn max_spacing(&self) -> f64;
    /// Mean of the squared components.
    fn mean_squared(&self) -> f64;
    /// All components finite and strictly positive.
    fn is_valid(&self) -> bool;
}

impl<const D: usize> SpacingExt for Spacing<D> {
    fn uniform(value: f64) -> Self {
        Spacing::from_element(value)
    }

    fn is_uniform(&self) -> bool {
        if D == 0 {
            return true;
        }
        let first = self[0];
        (1..D).all(|i| (self[i] - first).abs() < 1e-9)
    }

    fn min_spacing(&self) -> f64 {
        self.iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn max_spacing(&self) -> f64 {
        self.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn mean_squared(&self) -> f64 {
        if D == 0 {
            return 0.0;
        }
        self.iter().map(|s| s * s).sum::<f64>() / D as f64
    }

    fn is_valid(&self) -> bool {
        self.iter().all(|s| s.is_finite() && *s > 0.0)
    }
}
