//! Streaming image I/O over whole-slide images.
//!
//! The [`ImageIo`] trait is the narrow capability interface a host imaging
//! pipeline drives: check a file, read its image information, then read
//! regions into caller-owned buffers. [`SlideImageIo`] implements it on top of
//! a [`BackendSession`](crate::slide::BackendSession).
//!
//! ```text
//! set_level / set_associated_image / set_level_for_downsample
//!        │
//!        ▼
//! read_image_information ──▶ RasterDescriptor + MetadataMap
//!        │
//!        ▼
//! read_region(buffer, RegionRequest) ──▶ RGBA8 pixels in place
//! ```

mod adapter;
mod factory;
mod pixel;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::ImageIoError;

pub use crate::slide::Selection;
pub use adapter::{AdapterState, SlideImageIo};
pub use factory::{ImageIoConstructor, ImageIoFactory, SLIDE_IO_NAME};
pub use pixel::{argb_to_rgba, remap_argb_to_rgba, rgba_bytes};

/// Property snapshot taken by `read_image_information`.
pub type MetadataMap = BTreeMap<String, String>;

// =============================================================================
// Geometry
// =============================================================================

/// Geometry of the selected raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterDescriptor {
    pub width: u64,
    pub height: u64,

    /// Microns per pixel, `1.0` when unknown
    pub spacing_x: f64,
    pub spacing_y: f64,

    pub origin_x: f64,
    pub origin_y: f64,
}

impl RasterDescriptor {
    /// A descriptor with unit spacing at the origin.
    pub fn with_size(width: u64, height: u64) -> Self {
        Self {
            width,
            height,
            spacing_x: 1.0,
            spacing_y: 1.0,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }
}

/// A rectangle in the selected raster's own pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionRequest {
    pub x: i64,
    pub y: i64,
    pub width: u64,
    pub height: u64,
}

impl RegionRequest {
    pub fn new(x: i64, y: i64, width: u64, height: u64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole `width x height` raster.
    pub fn whole(width: u64, height: u64) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Number of pixels, if it fits in `usize`.
    pub fn pixel_count(&self) -> Result<usize, ImageIoError> {
        self.width
            .checked_mul(self.height)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or(ImageIoError::OverflowRejected {
                width: self.width,
                height: self.height,
            })
    }
}

// =============================================================================
// Pixel description
// =============================================================================

/// Layout of one output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelType {
    Rgba,
}

/// Storage type of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentType {
    U8,
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelType::Rgba => f.write_str("rgba"),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentType::U8 => f.write_str("unsigned_char"),
        }
    }
}

// =============================================================================
// ImageIo Trait
// =============================================================================

/// Capability interface driven by a host imaging pipeline.
pub trait ImageIo {
    /// Name under which the implementation registers.
    fn name(&self) -> &'static str;

    /// Whether this implementation can read `path`.
    fn can_read_file(&self, path: &Path) -> bool;

    fn set_file_name(&mut self, path: &Path);

    fn file_name(&self) -> Option<&Path>;

    /// Open the file and compute geometry and metadata for the selection.
    fn read_image_information(&mut self) -> Result<(), ImageIoError>;

    /// Geometry captured by the last successful `read_image_information`.
    fn descriptor(&self) -> Option<RasterDescriptor>;

    /// Metadata captured by the last successful `read_image_information`.
    fn metadata(&self) -> &MetadataMap;

    /// Whether sub-rectangles can be read independently.
    fn can_stream_read(&self) -> bool;

    /// The region that will actually be read to satisfy `requested`.
    fn generate_streamable_read_region(&self, requested: &RegionRequest) -> RegionRequest {
        *requested
    }

    /// Fill `buffer` with the pixels of `request`.
    fn read_region(
        &mut self,
        buffer: &mut [u32],
        request: &RegionRequest,
    ) -> Result<(), ImageIoError>;

    fn number_of_dimensions(&self) -> usize {
        2
    }

    fn pixel_type(&self) -> PixelType {
        PixelType::Rgba
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::U8
    }

    fn number_of_components(&self) -> usize {
        4
    }

    fn can_write_file(&self, _path: &Path) -> bool {
        false
    }

    fn write_image_information(&mut self) -> Result<(), ImageIoError> {
        Ok(())
    }

    fn write(&mut self, _buffer: &[u32]) -> Result<(), ImageIoError> {
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
