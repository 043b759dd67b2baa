//! Generic pyramidal TIFF reader.
//!
//! Supports TIFF files whose tiled images form a resolution pyramid and use
//! uncompressed or JPEG tiles. Stripped and off-pyramid images are ignored;
//! generic files have no associated images.
//!
//! Resolution comes from the XResolution / YResolution tags of level 0,
//! interpreted with its ResolutionUnit.

use tracing::debug;

use crate::error::{SlideError, TiffError};
use crate::io::RangeReader;
use crate::slide::{
    insert_level_properties, LevelInfo, SlideProperties, SlideReader, PROPERTY_MPP_X,
    PROPERTY_MPP_Y, PROPERTY_VENDOR,
};

use super::detect::SlideFormat;
use super::tiff::{Ifd, ResolutionUnit, TiffHeader, TiffPyramid, TiffTag, ValueReader};
use super::tiled::{insert_tiff_properties, load_levels, read_level_region, LevelData};

// =============================================================================
// Generic TIFF Reader
// =============================================================================

/// Reader for generic pyramidal TIFF files.
pub struct GenericTiffReader<R: RangeReader> {
    reader: R,
    levels: Vec<LevelData>,
    properties: SlideProperties,
}

impl<R: RangeReader> GenericTiffReader<R> {
    /// Open a TIFF file and parse its pyramid.
    ///
    /// Fails if no tiled pyramid is found or a level uses an unsupported
    /// compression.
    pub fn open(reader: R) -> Result<Self, TiffError> {
        let pyramid = TiffPyramid::parse(&reader)?;
        let levels = load_levels(&reader, &pyramid)?;

        let mut properties = SlideProperties::new();
        properties.insert(
            PROPERTY_VENDOR.to_string(),
            SlideFormat::GenericTiff.vendor().to_string(),
        );
        if let Some(base) = pyramid.levels.first() {
            insert_tiff_properties(&reader, &pyramid.header, &base.grid.ifd, &mut properties)?;
            insert_resolution(&reader, &pyramid.header, &base.grid.ifd, &mut properties)?;
        }
        let infos: Vec<LevelInfo> = levels.iter().map(LevelData::info).collect();
        insert_level_properties(&mut properties, &infos);

        debug!(
            file = reader.identifier(),
            levels = levels.len(),
            "opened generic TIFF slide"
        );

        Ok(GenericTiffReader {
            reader,
            levels,
            properties,
        })
    }
}

/// Export XResolution / YResolution and the derived microns per pixel.
fn insert_resolution<R: RangeReader + ?Sized>(
    reader: &R,
    header: &TiffHeader,
    ifd: &Ifd,
    properties: &mut SlideProperties,
) -> Result<(), TiffError> {
    let values = ValueReader::new(reader, header);
    let unit = ifd.resolution_unit(header.byte_order);
    properties.insert(
        "tiff.ResolutionUnit".to_string(),
        match unit {
            ResolutionUnit::None => "none",
            ResolutionUnit::Inch => "inch",
            ResolutionUnit::Centimeter => "centimeter",
        }
        .to_string(),
    );

    let axes = [
        (TiffTag::XResolution, "tiff.XResolution", PROPERTY_MPP_X),
        (TiffTag::YResolution, "tiff.YResolution", PROPERTY_MPP_Y),
    ];
    for (tag, name, mpp_name) in axes {
        let Some(entry) = ifd.get_entry_by_tag(tag) else {
            continue;
        };
        let resolution = match values.read_rational(entry) {
            Ok(resolution) => resolution,
            Err(err) => {
                debug!(tag = name, error = %err, "ignoring unreadable resolution");
                continue;
            }
        };
        properties.insert(name.to_string(), resolution.to_string());
        if let Some(mpp) = unit.microns_per_pixel(resolution) {
            properties.insert(mpp_name.to_string(), mpp.to_string());
        }
    }
    Ok(())
}

// =============================================================================
// SlideReader Implementation
// =============================================================================

impl<R: RangeReader> SlideReader for GenericTiffReader<R> {
    fn vendor(&self) -> &str {
        SlideFormat::GenericTiff.vendor()
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
        &[]
    }

    fn associated_image_dimensions(&self, _name: &str) -> Option<(u32, u32)> {
        None
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

    fn read_associated_image(&self, name: &str, _dest: &mut [u32]) -> Result<(), SlideError> {
        Err(SlideError::UnknownAssociatedImage(name.to_string()))
    }
}
