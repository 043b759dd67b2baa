//! Building blocks shared by the TIFF-based slide readers.
//!
//! Both readers end up with the same two kinds of images: pyramid levels,
//! addressed in level-0 coordinates, and associated images, always read
//! whole. This module loads their block locations and turns reads into
//! [`GridReader`] calls.

use tracing::debug;

use crate::error::{SlideError, TiffError};
use crate::io::RangeReader;
use crate::slide::{to_level_coordinate, LevelInfo, SlideProperties};
use crate::tile::GridReader;

use super::tiff::{
    validate_pyramid, Compression, Ifd, PyramidLevel, TiffHeader, TiffPyramid, TiffTag, TileData,
    TileGrid, ValueReader,
};

// =============================================================================
// Pyramid levels
// =============================================================================

/// A pyramid level with its block locations.
#[derive(Debug, Clone)]
pub struct LevelData {
    pub level: PyramidLevel,
    pub tile_data: TileData,
}

impl LevelData {
    pub fn info(&self) -> LevelInfo {
        let grid = &self.level.grid;
        LevelInfo {
            width: grid.width,
            height: grid.height,
            downsample: self.level.downsample,
            tile_width: grid.tile_width,
            tile_height: grid.tile_height,
        }
    }
}

/// Validate a parsed pyramid and load the block locations of every level.
///
/// Validation warnings are logged; the first validation error is returned.
pub fn load_levels<R: RangeReader + ?Sized>(
    reader: &R,
    pyramid: &TiffPyramid,
) -> Result<Vec<LevelData>, TiffError> {
    let validation = validate_pyramid(pyramid);
    for warning in &validation.warnings {
        debug!(file = reader.identifier(), warning = %warning, "pyramid validation warning");
    }
    validation.into_result()?;

    pyramid
        .levels
        .iter()
        .map(|level| {
            let tile_data = TileData::load(reader, &level.grid, &pyramid.header)?;
            Ok(LevelData {
                level: level.clone(),
                tile_data,
            })
        })
        .collect()
}

/// Read a level region whose top-left corner is given in level-0 coordinates.
#[allow(clippy::too_many_arguments)]
pub fn read_level_region<R: RangeReader + ?Sized>(
    reader: &R,
    levels: &[LevelData],
    dest: &mut [u32],
    x0: i64,
    y0: i64,
    level: usize,
    width: u32,
    height: u32,
) -> Result<(), SlideError> {
    let data = levels.get(level).ok_or(SlideError::LevelOutOfRange {
        level,
        count: levels.len(),
    })?;

    let downsample = data.level.downsample;
    let x = to_level_coordinate(x0, downsample);
    let y = to_level_coordinate(y0, downsample);

    GridReader::new(reader, &data.level.grid, &data.tile_data).read_region(dest, x, y, width, height)
}

// =============================================================================
// Associated images
// =============================================================================

/// A named non-pyramid image stored in the same file.
#[derive(Debug, Clone)]
pub struct AssociatedImage {
    pub name: String,
    pub grid: TileGrid,
    pub tile_data: TileData,
}

impl AssociatedImage {
    /// Prepare `ifd` as an associated image.
    ///
    /// Returns `Ok(None)` when the image cannot be decoded, so it is left out
    /// of the slide's list instead of failing on first read.
    pub fn load<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
        name: &str,
        ifd_index: usize,
        ifd: &Ifd,
    ) -> Result<Option<Self>, TiffError> {
        let Some(mut grid) = TileGrid::from_ifd(ifd.clone(), ifd_index, header.byte_order) else {
            debug!(name, ifd_index, "associated image has no usable geometry");
            return Ok(None);
        };
        grid.load_bits_per_sample(reader, header)?;

        let decodable = Compression::from_u16(grid.compression).is_some_and(|c| c.is_supported());
        if !decodable || !grid.has_tile_data() {
            debug!(
                name,
                ifd_index,
                compression = %Compression::describe(grid.compression),
                "skipping undecodable associated image"
            );
            return Ok(None);
        }
        if let Some(layout) = grid.unsupported_sample_layout() {
            debug!(name, ifd_index, layout = %layout, "skipping associated image with unsupported samples");
            return Ok(None);
        }

        let tile_data = TileData::load(reader, &grid, header)?;
        Ok(Some(AssociatedImage {
            name: name.to_string(),
            grid,
            tile_data,
        }))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.grid.width, self.grid.height)
    }

    /// Decode the whole image into `dest`.
    pub fn read<R: RangeReader + ?Sized>(&self, reader: &R, dest: &mut [u32]) -> Result<(), SlideError> {
        GridReader::new(reader, &self.grid, &self.tile_data).read_region(
            dest,
            0,
            0,
            self.grid.width,
            self.grid.height,
        )
    }
}

/// Find an associated image by name.
pub fn find_associated<'a>(
    images: &'a [AssociatedImage],
    name: &str,
) -> Result<&'a AssociatedImage, SlideError> {
    images
        .iter()
        .find(|image| image.name == name)
        .ok_or_else(|| SlideError::UnknownAssociatedImage(name.to_string()))
}

// =============================================================================
// Properties
// =============================================================================

/// ASCII tags exported as `tiff.<Name>` properties.
const STRING_TAGS: &[(TiffTag, &str)] = &[
    (TiffTag::ImageDescription, "ImageDescription"),
    (TiffTag::Make, "Make"),
    (TiffTag::Model, "Model"),
    (TiffTag::Software, "Software"),
    (TiffTag::DateTime, "DateTime"),
];

/// Read an ASCII tag, if present.
pub fn read_string_tag<R: RangeReader + ?Sized>(
    reader: &R,
    header: &TiffHeader,
    ifd: &Ifd,
    tag: TiffTag,
) -> Result<Option<String>, TiffError> {
    match ifd.get_entry_by_tag(tag) {
        Some(entry) => ValueReader::new(reader, header).read_string(entry).map(Some),
        None => Ok(None),
    }
}

/// Export the ASCII tags of `ifd` as `tiff.*` properties.
pub fn insert_tiff_properties<R: RangeReader + ?Sized>(
    reader: &R,
    header: &TiffHeader,
    ifd: &Ifd,
    properties: &mut SlideProperties,
) -> Result<(), TiffError> {
    for (tag, name) in STRING_TAGS {
        if let Some(value) = read_string_tag(reader, header, ifd, *tag)? {
            properties.insert(format!("tiff.{}", name), value);
        }
    }
    Ok(())
}
