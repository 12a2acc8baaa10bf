//! Template model for variable-data card production.
//!
//! Holds everything needed to design a card template and bind a data record
//! to it: the scene graph of design objects, mask geometry, placeholder
//! resolution, and the bounded undo/redo history used while editing.

pub mod constants;
pub mod geometry;
pub mod history;
mod record;
pub mod scene;
pub mod session;
mod types;
pub mod variables;

pub use geometry::{MaskGeometry, MaskShape, Point, Rect, mask_points};
pub use history::{History, HistoryError, Snapshot};
pub use record::Record;
pub use scene::*;
pub use session::{ActiveTool, EditorSession, Nudge};
pub use types::*;
pub use variables::{
    PhotoIndex, PhotoResolver, extract_photo_fields, extract_variables, resolve_code_data,
    resolve_object_text, resolve_text,
};
