//! Transform types and operations.
//!
//! This module provides the transform trait, the concrete transforms a
//! registration stage can produce, and the ordered [`TransformChain`] that
//! carries them to the resampler.

pub mod trait_;
pub mod translation;
pub mod affine;
pub mod displacement_field;
pub mod chain;

pub use trait_::Transform;
pub use translation::TranslationTransform;
pub use affine::AffineTransform;
pub use displacement_field::DisplacementField;
pub use chain::{ChainLink, TransformChain};
