//! Translation transform implementation.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::spatial::Vector;
use super::trait_::Transform;

/// Simple Translation Transform.
///
/// Translates points by a fixed offset vector.
#[derive(Debug, Clone)]
pub struct TranslationTransform<B: Backend, const D: usize> {
    translation: Tensor<B, 1>,
}

impl<B: Backend, const D: usize> TranslationTransform<B, D> {
    /// Create a new translation transform.
    ///
    /// # Arguments
    /// * `translation` - Tensor of shape `[D]` containing the translation vector
    pub fn new(translation: Tensor<B, 1>) -> Self {
        Self { translation }
    }

    /// Create a translation transform from a physical offset.
    pub fn from_vector(offset: &Vector<D>, device: &B::Device) -> Self {
        let values: Vec<f32> = offset.iter().map(|v| *v as f32).collect();
        let translation = Tensor::from_data(
            TensorData::new(values, [D]).convert::<B::FloatElem>(),
            device,
        );
        Self::new(translation)
    }

    /// Zero translation.
    pub fn identity(device: &B::Device) -> Self {
        Self::new(Tensor::zeros([D], device))
    }

    /// Get the translation vector.
    pub fn translation(&self) -> Tensor<B, 1> {
        self.translation.clone()
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for TranslationTransform<B, D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Broadcast [D] -> [1, D] over the batch
        let t = self.translation.clone().reshape([1, D]);
        points + t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_translation_transform() {
        let device = Default::default();
        let translation = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0], &device);
        let transform = TranslationTransform::<TestBackend, 3>::new(translation);

        let points = Tensor::<TestBackend, 2>::from_floats(
            [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
            &device,
        );

        let transformed = transform.transform_points(points);
        let values = transformed.into_data().to_vec::<f32>().unwrap();

        assert_eq!(values, vec![1.0, 2.0, 3.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_translation_from_vector() {
        let device = Default::default();
        let transform = TranslationTransform::<TestBackend, 3>::from_vector(
            &Vector::<3>::new(-1.0, 0.5, 2.0),
            &device,
        );
        let points = Tensor::<TestBackend, 2>::zeros([1, 3], &device);
        let values = transform.transform_points(points).into_data().to_vec::<f32>().unwrap();

        assert_eq!(values, vec![-1.0, 0.5, 2.0]);
    }
}
