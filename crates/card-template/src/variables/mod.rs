//! Variable resolution engine
//!
//! Finds the record fields a side depends on and rewrites text, codes and
//! photo slots for a single record.

mod photo;
mod text;

pub use photo::*;
pub use text::*;
