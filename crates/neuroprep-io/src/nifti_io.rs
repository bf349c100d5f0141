use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use nalgebra::{SMatrix, Vector3};
use ndarray::{Array3, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use neuroprep_core::image::{Image, ImageMetadata};
use neuroprep_core::spatial::{Direction, Point, Spacing};
use std::path::Path;
use tracing::debug;

/// NIfTI xyzt_units code for millimetres.
const UNITS_MM: u8 = 2;

/// Whether `path` names a NIfTI file by extension.
pub fn is_nifti_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| {
            let name = name.to_ascii_lowercase();
            name.ends_with(".nii") || name.ends_with(".nii.gz")
        })
        .unwrap_or(false)
}

/// Rows of the voxel-to-world affine: sform, then qform, then pixdim scaling.
fn header_affine(header: &NiftiHeader) -> [[f64; 4]; 3] {
    let row = |r: [f32; 4]| r.map(f64::from);

    if header.sform_code > 0 {
        return [row(header.srow_x), row(header.srow_y), row(header.srow_z)];
    }

    let dx = header.pixdim[1] as f64;
    let dy = header.pixdim[2] as f64;
    let dz = header.pixdim[3] as f64;

    if header.qform_code > 0 {
        let b = header.quatern_b as f64;
        let c = header.quatern_c as f64;
        let d = header.quatern_d as f64;
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let dz = dz * qfac;

        let r = [
            [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
            [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
            [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - b * b - c * c],
        ];
        let q = [header.quatern_x as f64, header.quatern_y as f64, header.quatern_z as f64];

        return [0, 1, 2].map(|i| [r[i][0] * dx, r[i][1] * dy, r[i][2] * dz, q[i]]);
    }

    [
        [dx, 0.0, 0.0, 0.0],
        [0.0, dy, 0.0, 0.0],
        [0.0, 0.0, dz, 0.0],
    ]
}

/// Split an affine into origin, per-axis spacing and unit direction columns.
fn affine_to_metadata(affine: &[[f64; 4]; 3]) -> ImageMetadata<3> {
    let origin = Point::<3>::new(affine[0][3], affine[1][3], affine[2][3]);
    let axes = [Vector3::x(), Vector3::y(), Vector3::z()];

    let mut spacing = Spacing::<3>::zeros();
    let mut columns = [Vector3::zeros(); 3];
    for c in 0..3 {
        let column = Vector3::new(affine[0][c], affine[1][c], affine[2][c]);
        let norm = column.norm();
        if norm > 1e-9 {
            spacing[c] = norm;
            columns[c] = column / norm;
        } else {
            spacing[c] = 1.0;
            columns[c] = axes[c];
        }
    }
    let direction: Direction<3> = SMatrix::<f64, 3, 3>::from_columns(&columns);

    ImageMetadata::new(origin, spacing, direction)
}

/// Read a 3D NIfTI volume.
///
/// A 4D file with a single volume is accepted. Intensity scaling from the
/// header (`scl_slope`, `scl_inter`) is applied.
pub fn read_nifti<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, 3>> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("failed to read NIfTI file {}", path.display()))?;
    let metadata = affine_to_metadata(&header_affine(obj.header()));

    let mut volume = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("failed to convert NIfTI volume to an array")?;
    while volume.ndim() > 3 && volume.shape()[volume.ndim() - 1] == 1 {
        let last = volume.ndim() - 1;
        volume = volume.index_axis_move(Axis(last), 0);
    }
    if volume.ndim() != 3 {
        bail!(
            "expected a 3D NIfTI volume in {}, found shape {:?}",
            path.display(),
            volume.shape()
        );
    }
    let volume = volume
        .into_dimensionality::<Ix3>()
        .context("failed to view NIfTI volume as 3D")?;

    // NIfTI arrays are indexed [x, y, z]; the image buffer is [Z, Y, X] row-major.
    let (nx, ny, nz) = volume.dim();
    let mut values = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                values.push(volume[[x, y, z]]);
            }
        }
    }

    debug!(path = %path.display(), shape = ?[nz, ny, nx], spacing = ?metadata.spacing().as_slice(), "read NIfTI volume");
    Image::from_values(values, [nz, ny, nx], metadata, device)
        .with_context(|| format!("invalid volume in {}", path.display()))
}

/// Write an image to a NIfTI file.
///
/// Geometry goes into the sform (code 1) and pixdim. An existing file is
/// overwritten; a `.nii.gz` path is gzip-compressed.
pub fn write_nifti<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    let path = path.as_ref();
    let [nz, ny, nx] = image.shape();
    let values = image.to_values().context("failed to read image data")?;

    let mut array = Array3::<f32>::zeros((nx, ny, nz));
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                array[[x, y, z]] = values[(z * ny + y) * nx + x];
            }
        }
    }

    let origin = image.origin();
    let spacing = image.spacing();
    let direction = image.direction();
    let srow = |r: usize| -> [f32; 4] {
        [
            (direction[(r, 0)] * spacing[0]) as f32,
            (direction[(r, 1)] * spacing[1]) as f32,
            (direction[(r, 2)] * spacing[2]) as f32,
            origin[r] as f32,
        ]
    };

    let mut header = NiftiHeader::default();
    header.sform_code = 1;
    header.qform_code = 0;
    header.srow_x = srow(0);
    header.srow_y = srow(1);
    header.srow_z = srow(2);
    header.pixdim = [1.0, spacing[0] as f32, spacing[1] as f32, spacing[2] as f32, 0.0, 0.0, 0.0, 0.0];
    header.xyzt_units = UNITS_MM;

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("failed to write NIfTI file {}", path.display()))?;

    debug!(path = %path.display(), "wrote NIfTI volume");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_read_nifti_axis_order() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.nii");

        // X=3, Y=4, Z=5 with value 100x + 10y + z
        let mut array = Array3::<f32>::zeros((3, 4, 5));
        for ((x, y, z), v) in array.indexed_iter_mut() {
            *v = (100 * x + 10 * y + z) as f32;
        }
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let device = Default::default();
        let image = read_nifti::<TestBackend, _>(&file_path, &device)?;
        assert_eq!(image.shape(), [5, 4, 3]);

        let values = image.to_values()?;
        // [Z, Y, X] = [4, 3, 2] is the last voxel
        assert_eq!(values[(4 * 4 + 3) * 3 + 2], 234.0);
        assert_eq!(values[1], 100.0);
        Ok(())
    }

    #[test]
    fn test_is_nifti_path() {
        assert!(is_nifti_path("a/b/sub-01_T1w.nii"));
        assert!(is_nifti_path("sub-01_T1w.nii.gz"));
        assert!(is_nifti_path("UPPER.NII.GZ"));
        assert!(!is_nifti_path("notes.txt"));
        assert!(!is_nifti_path("scan.nii.bak"));
    }

    #[test]
    fn test_affine_metadata_split() {
        let affine = [
            [0.0, -2.0, 0.0, 10.0],
            [3.0, 0.0, 0.0, -5.0],
            [0.0, 0.0, 1.5, 7.0],
        ];
        let metadata = affine_to_metadata(&affine);

        assert_eq!(metadata.origin(), &Point::<3>::new(10.0, -5.0, 7.0));
        assert_eq!(metadata.spacing(), &Spacing::<3>::new(3.0, 2.0, 1.5));
        assert_eq!(metadata.direction()[(1, 0)], 1.0);
        assert_eq!(metadata.direction()[(0, 1)], -1.0);
    }
}
