//! Pyramid validation.
//!
//! A slide is readable when it has at least one pyramid level and every level
//! uses a compression and sample layout the tile decoder handles, with sane
//! tile dimensions and its offset/byte-count tags present. Problems that do not prevent decoding
//! are reported as warnings.

use crate::error::TiffError;

use super::pyramid::{PyramidLevel, TiffPyramid};
use super::tags::{Compression, TiffTag};

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of validating a pyramid.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Fatal problems (empty if valid)
    pub errors: Vec<ValidationError>,

    /// Non-fatal issues worth logging
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first error as a [`TiffError`], or `Ok(())` if valid.
    pub fn into_result(self) -> Result<(), TiffError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

/// A specific validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Level data uses a compression the decoder cannot handle
    UnsupportedCompression { level: usize, compression: u16 },

    /// Samples are not 8-bit interleaved gray or RGB(A)
    UnsupportedSampleLayout { level: usize, layout: String },

    /// Block offset or byte count tags are missing
    MissingTileTags {
        level: usize,
        missing_tags: Vec<&'static str>,
    },

    /// No tiled IFD formed a pyramid
    NoPyramidLevels,

    /// Tile dimensions are zero
    InvalidTileDimensions {
        level: usize,
        tile_width: u32,
        tile_height: u32,
    },
}

impl From<ValidationError> for TiffError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::UnsupportedCompression { compression, .. } => {
                TiffError::UnsupportedCompression(Compression::describe(compression))
            }
            ValidationError::UnsupportedSampleLayout { layout, .. } => {
                TiffError::UnsupportedSampleLayout(layout)
            }
            ValidationError::MissingTileTags { missing_tags, .. } => {
                TiffError::MissingTag(missing_tags.first().copied().unwrap_or("TileOffsets"))
            }
            ValidationError::NoPyramidLevels => {
                TiffError::MissingTag("No valid pyramid levels found")
            }
            ValidationError::InvalidTileDimensions {
                tile_width,
                tile_height,
                ..
            } => TiffError::InvalidTagValue {
                tag: "TileWidth/TileLength",
                message: format!("tile dimensions {}x{} are invalid", tile_width, tile_height),
            },
        }
    }
}

// =============================================================================
// Level validation
// =============================================================================

/// Validate a single pyramid level.
pub fn validate_level(level: &PyramidLevel) -> ValidationResult {
    let mut result = ValidationResult::default();
    let grid = &level.grid;

    let supported = Compression::from_u16(grid.compression)
        .map(Compression::is_supported)
        .unwrap_or(false);
    if !supported {
        result.errors.push(ValidationError::UnsupportedCompression {
            level: level.level_index,
            compression: grid.compression,
        });
    }

    if let Some(layout) = grid.unsupported_sample_layout() {
        result.errors.push(ValidationError::UnsupportedSampleLayout {
            level: level.level_index,
            layout,
        });
    }

    let missing_tags: Vec<&'static str> = [
        ("TileOffsets", TiffTag::TileOffsets),
        ("TileByteCounts", TiffTag::TileByteCounts),
    ]
    .into_iter()
    .filter(|(_, tag)| grid.ifd.get_entry_by_tag(*tag).is_none())
    .map(|(name, _)| name)
    .collect();
    if !missing_tags.is_empty() {
        result.errors.push(ValidationError::MissingTileTags {
            level: level.level_index,
            missing_tags,
        });
    }

    if grid.tile_width == 0 || grid.tile_height == 0 {
        result.errors.push(ValidationError::InvalidTileDimensions {
            level: level.level_index,
            tile_width: grid.tile_width,
            tile_height: grid.tile_height,
        });
    } else if grid.tile_width % 16 != 0 || grid.tile_height % 16 != 0 {
        result.warnings.push(format!(
            "Level {}: tile dimensions {}x{} are not multiples of 16",
            level.level_index, grid.tile_width, grid.tile_height
        ));
    }

    if grid.compression == Compression::Jpeg as u16
        && grid.ifd.get_entry_by_tag(TiffTag::JpegTables).is_none()
    {
        result.warnings.push(format!(
            "Level {}: no JPEGTables tag (tiles must carry their own tables)",
            level.level_index
        ));
    }

    result
}

/// Validate every level of a pyramid.
pub fn validate_pyramid(pyramid: &TiffPyramid) -> ValidationResult {
    if pyramid.levels.is_empty() {
        return ValidationResult {
            errors: vec![ValidationError::NoPyramidLevels],
            warnings: Vec::new(),
        };
    }

    pyramid
        .levels
        .iter()
        .map(validate_level)
        .fold(ValidationResult::default(), |mut acc, level| {
            acc.errors.extend(level.errors);
            acc.warnings.extend(level.warnings);
            acc
        })
}

// =============================================================================
// Tests
// =============================================================================
