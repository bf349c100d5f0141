//! Error types for registration operations.

use neuroprep_core::CoreError;
use thiserror::Error;
use crate::engine::TransformKind;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Fixed or moving image has no usable intensity mass.
    #[error("Empty image: {0}")]
    EmptyImage(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Numerical instability detected.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failure reported by a registration engine.
    #[error("Engine error: {0}")]
    Engine(String),

    /// A progressive registration stage failed.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: TransformKind,
        #[source]
        source: Box<RegistrationError>,
    },

    /// Error from an image operation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create an empty image error.
    pub fn empty_image(msg: impl Into<String>) -> Self {
        Self::EmptyImage(msg.into())
    }

    /// Create a numerical instability error.
    pub fn numerical_instability(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Tag an error with the stage that raised it.
    pub fn stage(stage: TransformKind, source: RegistrationError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }

    /// The stage this error was raised in, if tagged.
    pub fn failed_stage(&self) -> Option<TransformKind> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistrationError::engine("did not converge");
        assert_eq!(err.to_string(), "Engine error: did not converge");
    }

    #[test]
    fn test_stage_error() {
        let err = RegistrationError::stage(
            TransformKind::Rigid,
            RegistrationError::numerical_instability("NaN in rotation"),
        );
        assert_eq!(err.failed_stage(), Some(TransformKind::Rigid));
        assert_eq!(err.to_string(), "Rigid stage failed: Numerical instability: NaN in rotation");
    }

    #[test]
    fn test_shape_mismatch() {
        let err = RegistrationError::ShapeMismatch {
            expected: vec![10, 10, 10],
            actual: vec![5, 5, 5],
        };
        let err_str = err.to_string();
        assert!(err_str.contains("expected"));
        assert!(err_str.contains("got"));
    }

    #[test]
    fn test_from_core_error() {
        let err: RegistrationError = CoreError::EmptyImage.into();
        assert!(matches!(err, RegistrationError::Core(CoreError::EmptyImage)));
    }
}
