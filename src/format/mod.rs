//! Format parsers for Whole Slide Image files.
//!
//! Everything here is TIFF-based. [`tiff`] parses the container; [`svs`] and
//! [`generic_tiff`] turn a parsed pyramid into a [`SlideReader`](crate::slide::SlideReader).
//!
//! # Format Detection
//!
//! Use [`detect::detect_format`] to identify the format of a slide file:
//!
//! - **Aperio SVS**: identified by an "Aperio" marker in ImageDescription
//! - **Generic Pyramidal TIFF**: any other tiled TIFF with a pyramid structure

pub mod detect;
pub mod generic_tiff;
pub mod jpeg;
pub mod svs;
pub mod tiff;
mod tiled;

pub use detect::{
    detect_format, detect_vendor, has_supported_extension, is_tiff_header, SlideFormat,
    SUPPORTED_EXTENSIONS,
};
pub use generic_tiff::GenericTiffReader;
pub use jpeg::{is_abbreviated_stream, merge_jpeg_tables, prepare_tile_jpeg};
pub use svs::{SvsMetadata, SvsReader};
