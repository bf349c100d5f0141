//! Image type with physical metadata and coordinate transformations.
//!
//! This module provides the Image struct which represents volumes
//! with tensor data and physical space metadata (origin, spacing, direction).

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::error::{CoreError, Result};
use crate::image::metadata::ImageMetadata;
use crate::spatial::{Direction, DirectionExt, Point, Spacing, Vector};

/// Volumetric image with physical metadata.
///
/// The Image type combines tensor data with the physical space metadata that
/// describes how voxel indices map to physical coordinates.
///
/// # Type Parameters
/// * `B` - The backend for tensor operations
/// * `D` - The dimensionality of the image
///
/// # Coordinate Systems
/// * **Index Space**: Discrete voxel indices, ordered `(x, y, z)`
/// * **Physical Space**: Continuous coordinates in mm
///
/// Voxel data is stored `[Z, Y, X]`, so `shape()[0]` is the extent along the
/// third index axis.
///
/// # Examples
/// ```rust
/// use neuroprep_core::Image;
/// use neuroprep_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
/// let origin = Point3::new(0.0, 0.0, 0.0);
/// let spacing = Spacing3::new(1.0, 1.0, 1.0);
/// let direction = Direction3::identity();
/// let image = Image::new(data, origin, spacing, direction);
/// assert_eq!(image.shape(), [10, 10, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    /// The voxel data.
    data: Tensor<B, D>,
    /// Physical coordinate of the first voxel (index 0,0,0).
    origin: Point<D>,
    /// Physical distance between voxels along each axis.
    spacing: Spacing<D>,
    /// Orientation of the image axes.
    direction: Direction<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image with the given data and metadata.
    ///
    /// # Arguments
    /// * `data` - The image data as a tensor
    /// * `origin` - Physical coordinate of the first voxel
    /// * `spacing` - Physical distance between voxels along each axis
    /// * `direction` - Orientation matrix of the image axes
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    /// Create an image from a tensor and a metadata bundle.
    pub fn from_metadata(data: Tensor<B, D>, metadata: ImageMetadata<D>) -> Self {
        Self::new(data, *metadata.origin(), *metadata.spacing(), *metadata.direction())
    }

    /// Build an image from host values laid out in tensor (row-major) order.
    pub fn from_values(
        values: Vec<f32>,
        shape: [usize; D],
        metadata: ImageMetadata<D>,
        device: &B::Device,
    ) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected || expected == 0 {
            return Err(CoreError::DataLength {
                len: values.len(),
                shape: shape.to_vec(),
            });
        }
        let data = TensorData::new(values, shape).convert::<B::FloatElem>();
        Ok(Self::from_metadata(Tensor::from_data(data, device), metadata))
    }

    /// Replace the voxel data, keeping this image's metadata.
    ///
    /// This is how every non-regridding stage hands metadata forward.
    pub fn with_data(&self, data: Tensor<B, D>) -> Self {
        Self::new(data, self.origin, self.spacing, self.direction)
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Consume the image, returning its tensor.
    pub fn into_data(self) -> Tensor<B, D> {
        self.data
    }

    /// Get the origin (physical coordinate of first voxel).
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing (physical distance between voxels).
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction (orientation matrix).
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Origin, spacing and direction as one value.
    pub fn metadata(&self) -> ImageMetadata<D> {
        ImageMetadata::new(self.origin, self.spacing, self.direction)
    }

    /// Get the image shape as an array.
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.shape().iter().product()
    }

    /// Copy the voxel values to the host in tensor (row-major) order.
    pub fn to_values(&self) -> Result<Vec<f32>> {
        self.data
            .clone()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| CoreError::TensorData(format!("{:?}", e)))
    }

    /// True when both images share shape and (approximately) metadata.
    pub fn same_grid(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.metadata().approx_eq(&other.metadata(), 1e-4)
    }

    /// Convert a continuous physical point to a continuous index.
    ///
    /// `index = (Direction^-1 * (point - origin)) / spacing`
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        let diff = point - self.origin;
        let rotated = self.direction.inverse_direction() * diff;

        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        index
    }

    /// Convert a continuous index to a physical point.
    ///
    /// `point = origin + Direction * (index * spacing)`
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        let mut scaled_index = Vector::<D>::zeros();
        for i in 0..D {
            scaled_index[i] = index[i] * self.spacing[i];
        }

        self.origin + self.direction * scaled_index
    }

    /// Batch transform physical points to continuous indices.
    ///
    /// # Arguments
    /// * `points` - A tensor of shape `[Batch, D]` containing physical points
    ///
    /// # Returns
    /// A tensor of shape `[Batch, D]` containing continuous indices
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let origin_tensor = self.origin_row(&device);

        // I = (P - O) @ T with T_rc = (D^-1)_cr / S_c
        let inv_dir = self.direction.inverse_direction();
        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((inv_dir[(c, r)] / self.spacing[c]) as f32);
            }
        }
        let t_tensor = Tensor::<B, 2>::from_data(
            TensorData::new(t_data, [D, D]).convert::<B::FloatElem>(),
            &device,
        );

        (points - origin_tensor).matmul(t_tensor)
    }

    /// Batch transform continuous indices to physical points.
    ///
    /// # Arguments
    /// * `indices` - A tensor of shape `[Batch, D]` containing continuous indices
    ///
    /// # Returns
    /// A tensor of shape `[Batch, D]` containing physical points
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();
        let origin_tensor = self.origin_row(&device);

        // P = O + I @ M with M_rc = S_r * D_cr
        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push((self.spacing[r] * self.direction[(c, r)]) as f32);
            }
        }
        let m_tensor = Tensor::<B, 2>::from_data(
            TensorData::new(m_data, [D, D]).convert::<B::FloatElem>(),
            &device,
        );

        indices.matmul(m_tensor) + origin_tensor
    }

    fn origin_row(&self, device: &B::Device) -> Tensor<B, 2> {
        let origin_vec: Vec<f32> = (0..D).map(|i| self.origin[i] as f32).collect();
        Tensor::<B, 2>::from_data(
            TensorData::new(origin_vec, [1, D]).convert::<B::FloatElem>(),
            device,
        )
    }
}
