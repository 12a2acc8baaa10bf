//! Scene graph model
//!
//! A template side is an ordered list of design objects (z-order equals
//! array position) plus a background and a physical size. This module covers:
//! - The object model and its typed payloads
//! - Lock-state normalization on load
//! - Variable-box / inner-text link maintenance
//! - The template persistence boundary

mod lock;
mod object;
mod serde_helpers;
mod side;
mod template;
mod variable_box;

pub use lock::*;
pub use object::*;
pub use side::*;
pub use template::*;
pub use variable_box::*;
