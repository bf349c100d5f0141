//! Registration for neuroprep.
//!
//! [`RegistrationEngine`] is the contract the pipeline calls;
//! [`MomentsDemonsEngine`] is the engine shipped with the crate and
//! [`ProgressiveRegistration`] sequences the four alignment stages.

pub mod config;
pub mod demons;
pub mod engine;
pub mod error;
pub mod moments;
pub mod native;
pub mod progressive;

pub use config::RegistrationConfig;
pub use engine::{RegistrationEngine, RegistrationOutput, TransformKind};
pub use error::{RegistrationError, Result};
pub use native::MomentsDemonsEngine;
pub use progressive::{AlignedVolume, ProgressiveRegistration};
