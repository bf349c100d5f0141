//! Linear interpolation implementation.

use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use super::trait_::{split_columns, Interpolator};

/// Linear Interpolator.
///
/// Performs trilinear interpolation over the eight voxels surrounding each index.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }

    fn gather_3d<B: Backend>(
        flat_data: &Tensor<B, 1>,
        x: &Tensor<B, 1, Int>,
        y: &Tensor<B, 1, Int>,
        z: &Tensor<B, 1, Int>,
        stride_y: i64,
        stride_z: i64,
    ) -> Tensor<B, 1> {
        let idx = z.clone().mul_scalar(stride_z) + y.clone().mul_scalar(stride_y) + x.clone();
        flat_data.clone().gather(0, idx)
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims(); // Z, Y, X
        let [x, y, z] = split_columns(indices);

        // Clamp first so edge voxels extend outward instead of blending with
        // a clamped duplicate at a fractional weight.
        let x = x.clamp(0.0, (d2 - 1) as f64);
        let y = y.clamp(0.0, (d1 - 1) as f64);
        let z = z.clamp(0.0, (d0 - 1) as f64);

        let x0 = x.clone().floor();
        let y0 = y.clone().floor();
        let z0 = z.clone().floor();

        let wx = x - x0.clone();
        let wy = y - y0.clone();
        let wz = z - z0.clone();

        let x1_i = (x0.clone() + 1.0).clamp(0.0, (d2 - 1) as f64).int();
        let y1_i = (y0.clone() + 1.0).clamp(0.0, (d1 - 1) as f64).int();
        let z1_i = (z0.clone() + 1.0).clamp(0.0, (d0 - 1) as f64).int();
        let x0_i = x0.int();
        let y0_i = y0.int();
        let z0_i = z0.int();

        let stride_z = (d1 * d2) as i64;
        let stride_y = d2 as i64;
        let flat = data.clone().reshape([d0 * d1 * d2]);

        let v000 = Self::gather_3d(&flat, &x0_i, &y0_i, &z0_i, stride_y, stride_z);
        let v100 = Self::gather_3d(&flat, &x1_i, &y0_i, &z0_i, stride_y, stride_z);
        let v010 = Self::gather_3d(&flat, &x0_i, &y1_i, &z0_i, stride_y, stride_z);
        let v110 = Self::gather_3d(&flat, &x1_i, &y1_i, &z0_i, stride_y, stride_z);
        let v001 = Self::gather_3d(&flat, &x0_i, &y0_i, &z1_i, stride_y, stride_z);
        let v101 = Self::gather_3d(&flat, &x1_i, &y0_i, &z1_i, stride_y, stride_z);
        let v011 = Self::gather_3d(&flat, &x0_i, &y1_i, &z1_i, stride_y, stride_z);
        let v111 = Self::gather_3d(&flat, &x1_i, &y1_i, &z1_i, stride_y, stride_z);

        let one_minus_wx = wx.clone().neg() + 1.0;
        let one_minus_wy = wy.clone().neg() + 1.0;
        let one_minus_wz = wz.clone().neg() + 1.0;

        // Along X
        let c00 = v000 * one_minus_wx.clone() + v100 * wx.clone();
        let c10 = v010 * one_minus_wx.clone() + v110 * wx.clone();
        let c01 = v001 * one_minus_wx.clone() + v101 * wx.clone();
        let c11 = v011 * one_minus_wx + v111 * wx;

        // Along Y
        let c0 = c00 * one_minus_wy.clone() + c10 * wy.clone();
        let c1 = c01 * one_minus_wy + c11 * wy;

        // Along Z
        c0 * one_minus_wz + c1 * wz
    }
}
