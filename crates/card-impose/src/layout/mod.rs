//! Layout calculation for card imposition
//!
//! This module handles the geometry of putting cards onto output pages:
//! - Packing (how many cards fit on a page, how many pages a batch needs)
//! - Slot addressing (record index to page/row/column, back-side mirroring)
//! - Placement (where a slot's card lands on the page, in points)

mod placement;
mod plan;
mod types;

pub use placement::*;
pub use plan::*;
pub use types::*;
