//! # WSI ImageIO
//!
//! Streaming image I/O for Whole Slide Images (WSI).
//!
//! A whole-slide file holds a pyramid of progressively downsampled levels and
//! a few associated images (thumbnail, label, macro). This library opens such
//! files with native Rust parsers and exposes them through a select / read
//! information / read region protocol that a generic imaging pipeline can
//! drive, one level or associated image at a time.
//!
//! ## Features
//!
//! - **Format support**: Native parsers for Aperio SVS and pyramidal TIFF formats
//! - **Region reads**: Any sub-rectangle of any level, read directly from tiles
//! - **Associated images**: Thumbnail, label and macro images of SVS files
//! - **Metadata**: Flat property map with resolution, bounds and vendor keys
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - Byte-range readers over files and memory
//! - [`mod@format`] - TIFF/SVS parsers and JPEG handling
//! - [`tile`] - Tile decoding and region compositing
//! - [`slide`] - Slide reader trait and backend session
//! - [`imageio`] - Streaming image I/O adapter and factory
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wsi_imageio::{ImageIo, RegionRequest, SlideImageIo};
//!
//! let mut io = SlideImageIo::new();
//! io.set_file_name(Path::new("slide.svs"));
//! io.set_level(1);
//! io.read_image_information()?;
//!
//! let request = RegionRequest::new(0, 0, 512, 512);
//! let mut pixels = vec![0u32; request.pixel_count()?];
//! io.read_region(&mut pixels, &request)?;
//! # Ok::<(), wsi_imageio::ImageIoError>(())
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod imageio;
pub mod io;
pub mod slide;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, DumpConfig, DumpFormat, StreamConfig, StreamDirectives, StreamSelection};
pub use error::{FormatError, ImageIoError, IoError, SlideError, TiffError};
pub use format::tiff::{
    validate_level, validate_pyramid, ByteOrder, Compression, FieldType, Ifd, IfdEntry,
    PyramidLevel, ResolutionUnit, TiffHeader, TiffPyramid, TiffTag, TileData, TileGrid,
    ValidationError, ValidationResult, ValueReader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};
pub use format::{
    detect_format, detect_vendor, has_supported_extension, is_tiff_header, GenericTiffReader,
    SlideFormat, SvsMetadata, SvsReader, SUPPORTED_EXTENSIONS,
};
pub use imageio::{
    rgba_bytes, AdapterState, ComponentType, ImageIo, ImageIoFactory, MetadataMap, PixelType,
    RasterDescriptor, RegionRequest, SlideImageIo,
};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use slide::{
    open_slide, BackendSession, LevelInfo, LocalSlideSource, Selection, SlideProperties,
    SlideReader, SlideSource,
};
pub use tile::{decode_block, pack_argb, DecodedTile, GridReader};
