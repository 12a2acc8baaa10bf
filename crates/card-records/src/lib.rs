//! Record sources for batch generation.
//!
//! - CSV/spreadsheet exports (first row is the header)
//! - Stored project records whose data may arrive as a JSON string
//! - ZIP archives of photos, indexed by file name for fallback matching

mod archive;
mod spreadsheet;
mod stored;
mod types;

pub use archive::*;
pub use spreadsheet::*;
pub use stored::*;
pub use types::*;
