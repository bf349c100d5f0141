//! Spatial types for representing points, vectors, spacing, and direction matrices.
//!
//! All types are nalgebra aliases over `f64`. Component order is `(x, y, z)`,
//! which is the reverse of the `[Z, Y, X]` tensor layout used for voxel data.

pub mod spacing;
pub mod direction;

use nalgebra::{Point as NaPoint, SMatrix, SVector};

pub use spacing::SpacingExt;
pub use direction::DirectionExt;

/// A position in physical space.
pub type Point<const D: usize> = NaPoint<f64, D>;
/// A displacement in physical space.
pub type Vector<const D: usize> = SVector<f64, D>;
/// Physical distance between adjacent voxels along each axis.
pub type Spacing<const D: usize> = SVector<f64, D>;
/// Direction cosines; column `i` is the physical direction of index axis `i`.
pub type Direction<const D: usize> = SMatrix<f64, D, D>;

pub type Point3 = Point<3>;
pub type Vector3 = Vector<3>;
pub type Spacing3 = Spacing<3>;
pub type Direction3 = Direction<3>;
