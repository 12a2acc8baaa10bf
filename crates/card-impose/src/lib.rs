pub mod constants;
pub mod impose;
pub mod layout;
pub mod marks;
mod options;
mod preview;
pub mod render;
mod stats;
mod types;

pub use impose::{
    BatchControl, BatchOutput, BatchProgress, BatchState, document_bytes, generate_batch,
    load_pdf, save_pdf, save_temp_pdf,
};
pub use layout::{LayoutPlan, PackRequest, plan};
pub use options::*;
pub use preview::{generate_preview, preview_to_temp_file};
pub use render::{CardRenderer, FontShaper, ImageFetcher, MemoryFetcher, RenderedCard, SourceFetcher};
pub use stats::{
    BatchStatistics, BatchSummary, IssueReport, RecordIssue, calculate_statistics,
};
pub use types::*;
