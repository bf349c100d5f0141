//! Core types for MRI volume preprocessing.
//!
//! Provides the volumetric [`Image`] (voxel tensor plus physical metadata),
//! spatial transforms, interpolators and the image filters the pipeline is
//! built from.

pub mod error;
pub mod image;
pub mod spatial;
pub mod transform;
pub mod interpolation;
pub mod filter;

pub use error::{CoreError, Result};
pub use image::{Image, ImageMetadata};
pub use spatial::{Point, Vector, Spacing, Direction};
