//! Image metadata types.
//!
//! Origin, spacing and direction travel together: every filter that does not
//! re-grid an image hands its input's metadata to its output unchanged.

use crate::spatial::{Direction, Point, Spacing, SpacingExt};

/// Image metadata containing physical space information.
///
/// Metadata describes how image indices map to physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMetadata<const D: usize> {
    /// Physical coordinate of the first voxel (index 0, 0, ...).
    origin: Point<D>,
    /// Physical distance between voxels along each axis.
    spacing: Spacing<D>,
    /// Orientation of the image axes.
    direction: Direction<D>,
}

impl<const D: usize> ImageMetadata<D> {
    /// Create new image metadata.
    pub fn new(origin: Point<D>, spacing: Spacing<D>, direction: Direction<D>) -> Self {
        Self {
            origin,
            spacing,
            direction,
        }
    }

    /// Get the origin.
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing.
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction.
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Set the origin.
    pub fn set_origin(&mut self, origin: Point<D>) {
        self.origin = origin;
    }

    /// Set the spacing.
    pub fn set_spacing(&mut self, spacing: Spacing<D>) {
        self.spacing = spacing;
    }

    /// Set the direction.
    pub fn set_direction(&mut self, direction: Direction<D>) {
        self.direction = direction;
    }

    /// Component-wise comparison within `tolerance`.
    ///
    /// Metadata read back from disk goes through `f32`, so exact equality is
    /// too strict when comparing against in-memory values.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        let origin_ok = (0..D).all(|i| (self.origin[i] - other.origin[i]).abs() <= tolerance);
        let spacing_ok = (0..D).all(|i| (self.spacing[i] - other.spacing[i]).abs() <= tolerance);
        let direction_ok = (0..D).all(|r| {
            (0..D).all(|c| (self.direction[(r, c)] - other.direction[(r, c)]).abs() <= tolerance)
        });
        origin_ok && spacing_ok && direction_ok
    }
}

impl<const D: usize> Default for ImageMetadata<D> {
    fn default() -> Self {
        Self {
            origin: Point::origin(),
            spacing: Spacing::uniform(1.0),
            direction: Direction::identity(),
        }
    }
}
