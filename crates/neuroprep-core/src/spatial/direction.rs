//! Helpers for direction-cosine matrices.

use super::Direction;

/// Convenience operations on [`Direction`].
pub trait DirectionExt {
    /// Inverse of an orthonormal direction matrix (its transpose).
    fn inverse_direction(&self) -> Self;
    /// `D * D^T` is the identity within tolerance.
    fn is_orthonormal(&self) -> bool;
}

impl<const D: usize> DirectionExt for Direction<D> {
    fn inverse_direction(&self) -> Self {
        self.transpose()
    }

    fn is_orthonormal(&self) -> bool {
        let product = self * self.transpose();
        (0..D).all(|i| {
            (0..D).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (product[(i, j)] - expected).abs() < 1e-6
            })
        })
    }
}
