//! TIFF parser for Whole Slide Images.
//!
//! Handles classic TIFF and BigTIFF in either byte order, which covers Aperio
//! SVS and generic pyramidal TIFF.
//!
//! - **IFD (Image File Directory)**: metadata and pointers to image data. A
//!   slide file has one IFD per pyramid level plus thumbnail, label and macro
//!   images.
//! - **Inline vs offset values**: small values live in the IFD entry, larger
//!   ones at an offset the entry points to.
//! - **Tiles vs strips**: pyramid levels are tiled; associated images are
//!   usually stored in strips.

mod parser;
mod pyramid;
mod tags;
mod validation;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{PyramidLevel, TiffPyramid, TileData, TileGrid};
pub use tags::{Compression, FieldType, ResolutionUnit, TiffTag};
pub use validation::{validate_level, validate_pyramid, ValidationError, ValidationResult};
pub use values::ValueReader;
