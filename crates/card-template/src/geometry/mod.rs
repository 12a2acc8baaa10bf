//! Geometry and mask generation
//!
//! Pure functions that turn a parametric shape kind plus a bounding box into
//! a clip region centered on the object's own origin.

mod mask;
mod types;

pub use mask::*;
pub use types::*;
