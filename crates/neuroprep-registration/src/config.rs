//! Configuration for the built-in registration engine.

use serde::{Deserialize, Serialize};
use crate::error::{RegistrationError, Result};

/// Registration engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Demons iterations in the deformable stage.
    pub demons_iterations: usize,
    /// Gaussian sigma (voxels) applied to the displacement field after each update.
    pub field_sigma: f64,
    /// Largest displacement update per iteration, in voxels.
    pub max_step: f64,
    /// Relative eigenvalue gap below which principal axes count as ambiguous.
    pub eigen_gap: f64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            demons_iterations: 40,
            field_sigma: 1.5,
            max_step: 2.0,
            eigen_gap: 0.05,
        }
    }
}

impl RegistrationConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of demons iterations.
    pub fn with_demons_iterations(mut self, iterations: usize) -> Self {
        self.demons_iterations = iterations;
        self
    }

    /// Set the displacement field smoothing sigma in voxels.
    pub fn with_field_sigma(mut self, sigma: f64) -> Self {
        self.field_sigma = sigma;
        self
    }

    /// Set the per-iteration step limit in voxels.
    pub fn with_max_step(mut self, step: f64) -> Self {
        self.max_step = step;
        self
    }

    /// Set the principal axis ambiguity threshold.
    pub fn with_eigen_gap(mut self, gap: f64) -> Self {
        self.eigen_gap = gap;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.field_sigma >= 0.0 && self.field_sigma.is_finite()) {
            return Err(RegistrationError::invalid_configuration(format!(
                "field sigma must be finite and non-negative, got {}",
                self.field_sigma
            )));
        }
        if !(self.max_step > 0.0 && self.max_step.is_finite()) {
            return Err(RegistrationError::invalid_configuration(format!(
                "max step must be positive, got {}",
                self.max_step
            )));
        }
        if !(0.0..1.0).contains(&self.eigen_gap) {
            return Err(RegistrationError::invalid_configuration(format!(
                "eigen gap must be in [0, 1), got {}",
                self.eigen_gap
            )));
        }
        Ok(())
    }
}
