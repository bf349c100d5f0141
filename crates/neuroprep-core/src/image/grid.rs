use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;

/// Generate a grid of continuous indices for a 3D image shape.
///
/// Returns a tensor of shape `[N, 3]` where N is the total number of voxels.
/// Rows follow the `[Z, Y, X]` memory order of the voxel data; columns are
/// `(x, y, z)`.
///
/// # Arguments
/// * `shape` - The image shape `[D, H, W]`
/// * `device` - The device to create the tensor on
pub fn generate_grid_3d<B>(
    shape: [usize; 3],
    device: &B::Device,
) -> Tensor<B, 2>
where
    B: Backend,
{
    let [d, h, w] = shape;
    let total = d * h * w;

    let mut grid = Vec::with_capacity(total * 3);
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                grid.push(x as f32);
                grid.push(y as f32);
                grid.push(z as f32);
            }
        }
    }

    let data = TensorData::new(grid, [total, 3]).convert::<B::FloatElem>();
    Tensor::<B, 2>::from_data(data, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_grid_order() {
        let device = Default::default();
        let grid = generate_grid_3d::<TestBackend>([2, 1, 3], &device);
        assert_eq!(grid.dims(), [6, 3]);

        let values = grid.into_data().to_vec::<f32>().unwrap();
        // Row 4 is z=1, y=0, x=1.
        assert_eq!(&values[12..15], &[1.0, 0.0, 1.0]);
    }
}
