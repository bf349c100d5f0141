//! Volume IO for neuroprep.
//!
//! NIfTI-1 files (`.nii`, `.nii.gz`) are read into [`neuroprep_core::Image`]
//! with origin, spacing and direction taken from the header affine, and
//! written back with that geometry in the sform.

pub mod nifti_io;

pub use nifti_io::{is_nifti_path, read_nifti, write_nifti};
