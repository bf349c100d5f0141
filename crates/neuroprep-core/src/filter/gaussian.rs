//! Separable Gaussian smoothing.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use crate::image::Image;
use crate::spatial::Spacing;

/// Gaussian smoothing filter.
///
/// Applies a Gaussian smoothing filter to an image using separable 1D convolutions.
/// Sigmas are physical (mm) and ordered `(x, y, z)` like spacing; a single
/// sigma applies to every axis. Samples outside the volume count as zero.
#[derive(Debug, Clone)]
pub struct GaussianFilter<B: Backend> {
    sigmas: Vec<f64>,
    max_kernel_width: usize,
    _b: std::marker::PhantomData<B>,
}

impl<B: Backend> GaussianFilter<B> {
    /// Create a new Gaussian filter with the given standard deviation (in physical units).
    ///
    /// # Arguments
    /// * `sigmas` - Standard deviation for each axis in physical units (mm).
    pub fn new(sigmas: Vec<f64>) -> Self {
        Self {
            sigmas,
            max_kernel_width: 33,
            _b: std::marker::PhantomData,
        }
    }

    /// Set the maximum kernel width (radius * 2 + 1).
    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = width.max(1);
        self
    }

    /// Apply the filter to an image.
    pub fn apply<const D: usize>(&self, image: &Image<B, D>) -> Image<B, D> {
        let data = self.apply_tensor(image.data().clone(), image.spacing());
        image.with_data(data)
    }

    /// Apply the filter to a tensor directly.
    ///
    /// # Arguments
    /// * `input` - Input tensor, axes in `[Z, Y, X]` order
    /// * `spacing` - Physical spacing of the data in `(x, y, z)` order
    pub fn apply_tensor<const D: usize>(&self, input: Tensor<B, D>, spacing: &Spacing<D>) -> Tensor<B, D> {
        let mut data = input;
        let device = data.device();

        for dim in 0..D {
            // Tensor axis `dim` runs along physical axis `D - 1 - dim`.
            let axis = D - 1 - dim;
            let sigma = self.sigmas.get(axis).or(self.sigmas.first()).copied().unwrap_or(0.0);
            if sigma <= 1e-6 || data.dims()[dim] < 2 {
                continue;
            }

            let pixel_sigma = sigma / spacing[axis];
            let radius = (3.0 * pixel_sigma).ceil() as usize;
            let width = (2 * radius + 1).min(self.max_kernel_width);
            let actual_radius = (width - 1) / 2;
            if actual_radius == 0 {
                continue;
            }

            let kernel = Self::generate_kernel(pixel_sigma, actual_radius);
            let len = kernel.len();
            let kernel_tensor = Tensor::<B, 1>::from_data(
                TensorData::new(kernel, [len]).convert::<B::FloatElem>(),
                &device,
            );

            data = Self::convolve_1d::<D>(data, kernel_tensor, dim);
        }
        data
    }

    fn generate_kernel(sigma: f64, radius: usize) -> Vec<f32> {
        let two_sigma2 = 2.0 * sigma * sigma;
        let raw: Vec<f64> = (0..=(2 * radius))
            .map(|i| {
                let x = (i as f64) - (radius as f64);
                (-x * x / two_sigma2).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();

        raw.into_iter().map(|v| (v / sum) as f32).collect()
    }

    fn convolve_1d<const D: usize>(input: Tensor<B, D>, kernel: Tensor<B, 1>, dim: usize) -> Tensor<B, D> {
        let dims: [usize; D] = input.dims();

        // Move the target axis last
        let mut permute_indices = [0isize; D];
        let mut idx = 0;
        for i in 0..D {
            if i != dim {
                permute_indices[idx] = i as isize;
                idx += 1;
            }
        }
        permute_indices[D - 1] = dim as isize;

        let mut permuted_shape = [0usize; D];
        for (pos, &src) in permute_indices.iter().enumerate() {
            permuted_shape[pos] = dims[src as usize];
        }

        let length = dims[dim];
        let batch_size: usize = dims.iter().product::<usize>() / length;

        // conv1d input is [Batch, Channels=1, Length]
        let input_reshaped = input.permute(permute_indices).reshape([batch_size, 1, length]);

        let kernel_size = kernel.dims()[0];
        let kernel_reshaped = kernel.reshape([1, 1, kernel_size]);

        // Odd kernel with padding k/2 preserves length
        let options = ConvOptions::new([1], [kernel_size / 2], [1], 1);
        let output = burn::tensor::module::conv1d(input_reshaped, kernel_reshaped, None, options);

        let mut inv_permute_indices = [0isize; D];
        for (new_pos, &old_pos) in permute_indices.iter().enumerate() {
            inv_permute_indices[old_pos as usize] = new_pos as isize;
        }

        output.reshape(permuted_shape).permute(inv_permute_indices)
    }
}
