//! Affine transform implementation.
//!
//! This module provides an affine transform (linear transformation + translation).

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use nalgebra::SMatrix;
use crate::spatial::{Point, Vector};
use super::trait_::Transform;

/// Affine Transform (Linear transformation + Translation).
///
/// Represents a general affine transformation with a fixed center:
/// T(x) = A(x - c) + c + t
///
/// where:
/// * A is a D×D matrix (linear transformation: rotation, scale, shear)
/// * t is a D-dimensional translation vector
/// * c is a D-dimensional fixed center of rotation/scaling
#[derive(Debug, Clone)]
pub struct AffineTransform<B: Backend, const D: usize> {
    matrix: Tensor<B, 2>,      // [D, D]
    translation: Tensor<B, 1>, // [D]
    center: Tensor<B, 1>,      // [D]
}

impl<B: Backend, const D: usize> AffineTransform<B, D> {
    /// Create a new affine transform.
    ///
    /// # Arguments
    /// * `matrix` - Tensor of shape `[D, D]` containing the linear transformation matrix
    /// * `translation` - Tensor of shape `[D]` containing the translation vector
    /// * `center` - Tensor of shape `[D]` containing the fixed center
    pub fn new(matrix: Tensor<B, 2>, translation: Tensor<B, 1>, center: Tensor<B, 1>) -> Self {
        Self { matrix, translation, center }
    }

    /// Build an affine transform from host-side nalgebra parameters.
    pub fn from_parts(
        matrix: &SMatrix<f64, D, D>,
        translation: &Vector<D>,
        center: &Point<D>,
        device: &B::Device,
    ) -> Self {
        let mut m = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m.push(matrix[(r, c)] as f32);
            }
        }
        let t: Vec<f32> = translation.iter().map(|v| *v as f32).collect();
        let c: Vec<f32> = center.iter().map(|v| *v as f32).collect();

        Self::new(
            Tensor::from_data(TensorData::new(m, [D, D]).convert::<B::FloatElem>(), device),
            Tensor::from_data(TensorData::new(t, [D]).convert::<B::FloatElem>(), device),
            Tensor::from_data(TensorData::new(c, [D]).convert::<B::FloatElem>(), device),
        )
    }

    /// Create an identity affine transform.
    ///
    /// # Arguments
    /// * `center` - Optional center of rotation. If None, uses origin (0,0...0).
    /// * `device` - Device to create tensors on.
    pub fn identity(center: Option<Tensor<B, 1>>, device: &B::Device) -> Self {
        let matrix = Tensor::<B, 2>::eye(D, device);
        let translation = Tensor::<B, 1>::zeros([D], device);
        let center = center.unwrap_or_else(|| Tensor::<B, 1>::zeros([D], device));

        Self::new(matrix, translation, center)
    }

    /// Get the transformation matrix.
    pub fn matrix(&self) -> Tensor<B, 2> {
        self.matrix.clone()
    }

    /// Get the translation vector.
    pub fn translation(&self) -> Tensor<B, 1> {
        self.translation.clone()
    }

    /// Get the center of rotation.
    pub fn center(&self) -> Tensor<B, 1> {
        self.center.clone()
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for AffineTransform<B, D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row-vector form for [N, D] inputs: y = (x - c) @ A^T + c + t
        let c = self.center.clone().reshape([1, D]);
        let t = self.translation.clone().reshape([1, D]);

        let centered = points - c.clone();
        let rotated = centered.matmul(self.matrix.clone().transpose());

        rotated + c + t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_affine_transform_identity() {
        let device = Default::default();
        let transform = AffineTransform::<TestBackend, 3>::identity(None, &device);

        let points = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            &device,
        );

        let values = transform.transform_points(points).into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_affine_transform_translation_with_center() {
        let device = Default::default();
        let matrix = Tensor::<TestBackend, 2>::eye(2, &device);
        let translation = Tensor::<TestBackend, 1>::from_floats([1.0, 1.0], &device);
        let center = Tensor::<TestBackend, 1>::from_floats([10.0, 10.0], &device);
        let transform = AffineTransform::<TestBackend, 2>::new(matrix, translation, center);

        // T(c) = c + t
        let points = Tensor::<TestBackend, 2>::from_floats([[10.0, 10.0]], &device);
        let values = transform.transform_points(points).into_data().to_vec::<f32>().unwrap();

        assert_eq!(values, vec![11.0, 11.0]);
    }

    #[test]
    fn test_affine_from_parts_rotation_about_center() {
        let device = Default::default();
        // 90 degrees about z
        let rotation = SMatrix::<f64, 3, 3>::new(
            0.0, -1.0, 0.0,
            1.0, 0.0, 0.0,
            0.0, 0.0, 1.0,
        );
        let transform = AffineTransform::<TestBackend, 3>::from_parts(
            &rotation,
            &Vector::<3>::zeros(),
            &Point::<3>::new(1.0, 1.0, 0.0),
            &device,
        );

        // (2,1,0) - c = (1,0,0) -> (0,1,0) + c = (1,2,0)
        let points = Tensor::<TestBackend, 2>::from_floats([[2.0, 1.0, 0.0]], &device);
        let values = transform.transform_points(points).into_data().to_vec::<f32>().unwrap();

        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!((values[1] - 2.0).abs() < 1e-6);
        assert!(values[2].abs() < 1e-6);
    }
}
