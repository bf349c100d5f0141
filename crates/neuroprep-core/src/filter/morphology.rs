//! Binary morphology.

use burn::tensor::backend::Backend;
use crate::error::Result;
use crate::image::Image;

/// Ball structuring element offsets `(dz, dy, dx)` for a voxel radius.
fn ball_offsets(radius: usize) -> Vec<(isize, isize, isize)> {
    let r = radius as isize;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for dz in -r..=r {
        for dy in -r..=r {
            for dx in -r..=r {
                if dz * dz + dy * dy + dx * dx <= r2 {
                    offsets.push((dz, dy, dx));
                }
            }
        }
    }
    offsets
}

/// Dilate a binary image with a ball of `radius` voxels.
///
/// Any non-zero voxel counts as foreground. The output holds only 0 and 1
/// and keeps the input's metadata.
pub fn binary_dilate<B: Backend>(image: &Image<B, 3>, radius: usize) -> Result<Image<B, 3>> {
    let [nz, ny, nx] = image.shape();
    let input = image.to_values()?;
    let foreground: Vec<bool> = input.iter().map(|v| v.abs() > 0.0).collect();
    let mut output: Vec<f32> = foreground.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect();

    let flat = |z: usize, y: usize, x: usize| (z * ny + y) * nx + x;
    let is_fg = |z: isize, y: isize, x: isize| {
        z >= 0
            && y >= 0
            && x >= 0
            && (z as usize) < nz
            && (y as usize) < ny
            && (x as usize) < nx
            && foreground[flat(z as usize, y as usize, x as usize)]
    };

    let offsets = ball_offsets(radius);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                if !foreground[flat(z, y, x)] {
                    continue;
                }
                let (zi, yi, xi) = (z as isize, y as isize, x as isize);
                // Interior voxels add nothing beyond what boundary voxels cover.
                let interior = is_fg(zi - 1, yi, xi)
                    && is_fg(zi + 1, yi, xi)
                    && is_fg(zi, yi - 1, xi)
                    && is_fg(zi, yi + 1, xi)
                    && is_fg(zi, yi, xi - 1)
                    && is_fg(zi, yi, xi + 1);
                if interior {
                    continue;
                }
                for &(dz, dy, dx) in &offsets {
                    let (tz, ty, tx) = (zi + dz, yi + dy, xi + dx);
                    if tz < 0 || ty < 0 || tx < 0 {
                        continue;
                    }
                    let (tz, ty, tx) = (tz as usize, ty as usize, tx as usize);
                    if tz < nz && ty < ny && tx < nx {
                        output[flat(tz, ty, tx)] = 1.0;
                    }
                }
            }
        }
    }

    Image::from_values(output, [nz, ny, nx], image.metadata(), &image.data().device())
}
