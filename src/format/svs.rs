//! Aperio SVS format reader.
//!
//! SVS files are TIFF files containing:
//! - **Pyramid levels**: full resolution image and progressively smaller versions
//! - **Thumbnail**: the first stripped image after level 0
//! - **Label image**: small image of the slide label
//! - **Macro image**: overview of the entire slide
//!
//! # Metadata
//!
//! SVS files store metadata in the ImageDescription tag of level 0:
//!
//! ```text
//! Aperio Image Library v12.0.15
//! 46920x33600 (256x256) JPEG/RGB Q=70|AppMag = 20|MPP = 0.499|...
//! ```
//!
//! The first segment identifies the scanner software; every later segment is
//! a `key = value` pair exported as an `aperio.<key>` property.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{SlideError, TiffError};
use crate::io::RangeReader;
use crate::slide::{
    insert_level_properties, LevelInfo, SlideProperties, SlideReader, PROPERTY_MPP_X,
    PROPERTY_MPP_Y, PROPERTY_OBJECTIVE_POWER, PROPERTY_VENDOR,
};

use super::detect::SlideFormat;
use super::tiff::{TiffPyramid, TiffTag};
use super::tiled::{
    find_associated, insert_tiff_properties, load_levels, read_level_region, read_string_tag,
    AssociatedImage, LevelData,
};

// =============================================================================
// SVS Metadata
// =============================================================================

/// Parsed metadata from an SVS ImageDescription.
#[derive(Debug, Clone, Default)]
pub struct SvsMetadata {
    /// Microns per pixel (resolution)
    pub mpp: Option<f64>,

    /// Objective magnification (e.g., 20, 40)
    pub magnification: Option<f64>,

    /// Scanner vendor name
    pub vendor: Option<String>,

    /// Full ImageDescription string
    pub image_description: Option<String>,

    /// Every `key = value` pair after the first segment
    pub properties: BTreeMap<String, String>,
}

impl SvsMetadata {
    /// Parse metadata from an ImageDescription string.
    pub fn parse(description: &str) -> Self {
        let mut metadata = SvsMetadata {
            image_description: Some(description.to_string()),
            ..Default::default()
        };

        if description.contains("Aperio") {
            metadata.vendor = Some("Aperio".to_string());
        }

        // The first segment is the software banner and image summary
        for part in description.split('|').skip(1) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                continue;
            }

            match key {
                "MPP" => metadata.mpp = value.parse::<f64>().ok(),
                "AppMag" => metadata.magnification = value.parse::<f64>().ok(),
                _ => {}
            }
            metadata
                .properties
                .insert(key.to_string(), value.to_string());
        }

        metadata
    }
}

/// Associated image name announced by an ImageDescription, if any.
fn associated_name_from_description(description: &str) -> Option<&'static str> {
    if description.contains("label") {
        Some("label")
    } else if description.contains("macro") {
        Some("macro")
    } else {
        None
    }
}

// =============================================================================
// SVS Reader
// =============================================================================

/// Reader for Aperio SVS files.
pub struct SvsReader<R: RangeReader> {
    reader: R,
    levels: Vec<LevelData>,
    associated: Vec<AssociatedImage>,
    associated_names: Vec<String>,
    metadata: SvsMetadata,
    properties: SlideProperties,
}

impl<R: RangeReader> SvsReader<R> {
    /// Open an SVS file and parse its structure.
    ///
    /// Reads the TIFF directory chain, validates the pyramid, loads tile
    /// locations for every level and classifies the remaining images.
    pub fn open(reader: R) -> Result<Self, TiffError> {
        let pyramid = TiffPyramid::parse(&reader)?;
        let levels = load_levels(&reader, &pyramid)?;

        let mut properties = SlideProperties::new();
        let mut metadata = SvsMetadata::default();
        if let Some(base) = pyramid.levels.first() {
            insert_tiff_properties(&reader, &pyramid.header, &base.grid.ifd, &mut properties)?;
            if let Some(description) = properties.get("tiff.ImageDescription") {
                metadata = SvsMetadata::parse(description);
            }
        }

        let associated = Self::load_associated(&reader, &pyramid)?;
        let associated_names = associated.iter().map(|image| image.name.clone()).collect();

        Self::insert_properties(&mut properties, &metadata, &levels);

        debug!(
            file = reader.identifier(),
            levels = levels.len(),
            associated = associated.len(),
            mpp = ?metadata.mpp,
            "opened SVS slide"
        );

        Ok(SvsReader {
            reader,
            levels,
            associated,
            associated_names,
            metadata,
            properties,
        })
    }

    /// Name and load the non-pyramid images.
    ///
    /// The first stripped image after level 0 is the thumbnail; label and
    /// macro images announce themselves in their ImageDescription.
    fn load_associated(reader: &R, pyramid: &TiffPyramid) -> Result<Vec<AssociatedImage>, TiffError> {
        let base_index = match pyramid.levels.first() {
            Some(level) => level.grid.ifd_index,
            None => return Ok(Vec::new()),
        };

        let mut images: Vec<AssociatedImage> = Vec::new();
        let mut thumbnail_seen = false;

        for (ifd_index, ifd) in &pyramid.other_ifds {
            let name = if !thumbnail_seen && *ifd_index > base_index && !ifd.is_tiled() {
                thumbnail_seen = true;
                "thumbnail"
            } else {
                let description =
                    read_string_tag(reader, &pyramid.header, ifd, TiffTag::ImageDescription)?;
                match description.as_deref().and_then(associated_name_from_description) {
                    Some(name) => name,
                    None => continue,
                }
            };

            if images.iter().any(|image| image.name == name) {
                continue;
            }
            if let Some(image) = AssociatedImage::load(reader, &pyramid.header, name, *ifd_index, ifd)? {
                images.push(image);
            }
        }

        Ok(images)
    }

    fn insert_properties(properties: &mut SlideProperties, metadata: &SvsMetadata, levels: &[LevelData]) {
        properties.insert(PROPERTY_VENDOR.to_string(), SlideFormat::AperioSvs.vendor().to_string());

        for (key, value) in &metadata.properties {
            properties.insert(format!("aperio.{}", key), value.clone());
        }
        if let Some(mpp) = metadata.mpp {
            properties.insert(PROPERTY_MPP_X.to_string(), mpp.to_string());
            properties.insert(PROPERTY_MPP_Y.to_string(), mpp.to_string());
        }
        if let Some(magnification) = metadata.magnification {
            properties.insert(PROPERTY_OBJECTIVE_POWER.to_string(), magnification.to_string());
        }

        let infos: Vec<LevelInfo> = levels.iter().map(LevelData::info).collect();
        insert_level_properties(properties, &infos);
    }

    pub fn metadata(&self) -> &SvsMetadata {
        &self.metadata
    }
}

// =============================================================================
// SlideReader Implementation
// =============================================================================

impl<R: RangeReader> SlideReader for SvsReader<R> {
    fn vendor(&self) -> &str {
        SlideFormat::AperioSvs.vendor()
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|l| (l.level.width(), l.level.height()))
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.levels.get(level).map(|l| l.level.downsample)
    }

    fn level_tile_size(&self, level: usize) -> Option<(u32, u32)> {
        self.levels
            .get(level)
            .map(|l| (l.level.grid.tile_width, l.level.grid.tile_height))
    }

    fn associated_image_names(&self) -> &[String] {
        &self.associated_names
    }

    fn associated_image_dimensions(&self, name: &str) -> Option<(u32, u32)> {
        find_associated(&self.associated, name)
            .ok()
            .map(AssociatedImage::dimensions)
    }

    fn properties(&self) -> &SlideProperties {
        &self.properties
    }

    fn read_region(
        &self,
        dest: &mut [u32],
        x0: i64,
        y0: i64,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<(), SlideError> {
        read_level_region(&self.reader, &self.levels, dest, x0, y0, level, width, height)
    }

    fn read_associated_image(&self, name: &str, dest: &mut [u32]) -> Result<(), SlideError> {
        find_associated(&self.associated, name)?.read(&self.reader, dest)
    }
}

// =============================================================================
// Tests
// =============================================================================
