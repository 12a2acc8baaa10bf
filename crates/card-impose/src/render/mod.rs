//! Per-record card rendering.
//!
//! A record is applied to a private copy of a template side, its photos are
//! fetched under a timeout, and the result is rasterized at the export
//! resolution with the bleed area painted around it.

mod card;
pub mod color;
mod draw;
mod fetch;
mod resolve;
mod surface;
mod symbols;
mod text;

pub use card::{CardRenderer, RenderedCard};
pub use draw::{ImageMap, TextRun};
pub use fetch::{
    ImageFetcher, LoadResult, MemoryFetcher, SourceFetcher, decode_data_url, load_images,
};
pub use resolve::{AppliedCard, PhotoRequest, ResolveContext, apply_record, substitute_photo};
pub use surface::{ObjectFrame, Surface};
pub use symbols::{QrMatrix, encode_barcode, encode_qr};
pub use text::{
    ApproxShaper, FontShaper, TextLayout, TextLine, TextShaper, fit_font_size, layout_text,
};
