//! PDF overlay editing and document tools
//!
//! This crate does the document work for the pdfsuite server and browser
//! editor using lopdf:
//! - Overlay model, percentage-space coordinates and the drag/resize state machine
//! - `flatten_elements`: bakes text, rectangles and images into page content
//! - `merge_documents` / `split_document` / `compress_document`
//! - `images_to_pdf` / `csv_to_pdf` / `xlsx_to_pdf` conversions and `extract_text`
//!
//! Everything here is synchronous. Fonts that live on the network are fetched
//! by the caller ahead of a save and handed in through [`fonts::FontSource`].

pub mod assemble;
pub mod command;
pub mod compress;
pub mod convert;
pub mod coords;
pub mod elements;
pub mod error;
pub mod flatten;
pub mod fonts;
pub mod images;
pub mod interaction;
pub mod merge;
pub mod pages;
pub mod session;
pub mod split;
pub mod text;

#[cfg(test)]
mod test_support;

pub use assemble::{fit_image, images_to_pdf, ImageInput, ImagePlacement};
pub use command::{execute, output_file_name, OutputKind, PdfCommand, ProcessMetrics, ProcessResult};
pub use compress::{compress_document, CompressionResult};
pub use convert::{csv_to_pdf, xlsx_to_pdf};
pub use coords::{PageBox, PercentBox, PdfRect};
pub use elements::{
    ElementId, ElementKind, ElementStore, ElementUpdate, OverlayElement, Point, Size, TextStyle,
};
pub use error::PdfSuiteError;
pub use flatten::{flatten_elements, FlattenOutput, FlattenReport};
pub use fonts::{FontCatalog, FontSource, NoNetwork, PrefetchedFonts};
pub use interaction::{Container, InteractionController, Pointer, ResizeHandle};
pub use merge::merge_documents;
pub use pages::{get_page_count, parse_page_selection};
pub use session::{EditorSession, Tool, ViewState, ViewUpdate};
pub use split::{split_document, split_selection};
pub use text::extract_text;
