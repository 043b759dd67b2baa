//! Slide reader trait.
//!
//! [`SlideReader`] is the boundary between format-specific parsers and the
//! session layer. Everything above it sees a pyramid of levels, a list of
//! associated images and a flat property map; everything below it knows about
//! IFDs, tiles and compression.

use std::collections::BTreeMap;

use crate::error::SlideError;

// =============================================================================
// Well-known properties
// =============================================================================

/// Vendor string of the format that opened the slide.
pub const PROPERTY_VENDOR: &str = "wsi.vendor";

/// Number of pyramid levels.
pub const PROPERTY_LEVEL_COUNT: &str = "wsi.level-count";

/// Microns per pixel along X at level 0.
pub const PROPERTY_MPP_X: &str = "wsi.mpp-x";

/// Microns per pixel along Y at level 0.
pub const PROPERTY_MPP_Y: &str = "wsi.mpp-y";

/// X offset of the non-empty region, in level-0 pixels.
pub const PROPERTY_BOUNDS_X: &str = "wsi.bounds-x";

/// Y offset of the non-empty region, in level-0 pixels.
pub const PROPERTY_BOUNDS_Y: &str = "wsi.bounds-y";

/// Magnification of the scanning objective.
pub const PROPERTY_OBJECTIVE_POWER: &str = "wsi.objective-power";

/// Property name for a per-level attribute, e.g. `wsi.level[2].downsample`.
pub fn level_property(level: usize, attribute: &str) -> String {
    format!("wsi.level[{}].{}", level, attribute)
}

/// Flat, sorted property map reported by a slide.
pub type SlideProperties = BTreeMap<String, String>;

// =============================================================================
// LevelInfo
// =============================================================================

/// Snapshot of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelInfo {
    /// Width in pixels at this level
    pub width: u32,

    /// Height in pixels at this level
    pub height: u32,

    /// Downsample factor relative to level 0 (1.0 for level 0)
    pub downsample: f64,

    /// Width of stored tiles (strip width for stripped images)
    pub tile_width: u32,

    /// Height of stored tiles (rows per strip for stripped images)
    pub tile_height: u32,
}

/// Insert the `wsi.level-count` and `wsi.level[N].*` entries for `levels`.
pub fn insert_level_properties(properties: &mut SlideProperties, levels: &[LevelInfo]) {
    properties.insert(PROPERTY_LEVEL_COUNT.to_string(), levels.len().to_string());
    for (index, info) in levels.iter().enumerate() {
        properties.insert(level_property(index, "width"), info.width.to_string());
        properties.insert(level_property(index, "height"), info.height.to_string());
        properties.insert(level_property(index, "downsample"), info.downsample.to_string());
        properties.insert(level_property(index, "tile-width"), info.tile_width.to_string());
        properties.insert(level_property(index, "tile-height"), info.tile_height.to_string());
    }
}

// =============================================================================
// SlideReader Trait
// =============================================================================

/// Format-agnostic access to an opened whole-slide image.
///
/// Implementations own their byte source, so a `Box<dyn SlideReader>` is a
/// complete open slide. Dropping it releases the file.
///
/// Pixels are packed `u32` words in ARGB order (`a<<24 | r<<16 | g<<8 | b`).
/// Implementations are not required to be reentrant; callers serialize access.
pub trait SlideReader: Send {
    /// Short vendor string, e.g. `"aperio"`.
    fn vendor(&self) -> &str;

    /// Number of pyramid levels.
    fn level_count(&self) -> usize;

    /// Dimensions of a level in its own pixel space.
    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)>;

    /// Downsample factor of a level relative to level 0.
    fn level_downsample(&self, level: usize) -> Option<f64>;

    /// Stored tile size of a level.
    fn level_tile_size(&self, level: usize) -> Option<(u32, u32)>;

    /// Full-resolution dimensions.
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.level_dimensions(0)
    }

    /// Collect everything known about a level.
    fn level_info(&self, level: usize) -> Option<LevelInfo> {
        let (width, height) = self.level_dimensions(level)?;
        let downsample = self.level_downsample(level)?;
        let (tile_width, tile_height) = self.level_tile_size(level)?;
        Some(LevelInfo {
            width,
            height,
            downsample,
            tile_width,
            tile_height,
        })
    }

    /// Level whose downsample is closest to `downsample`.
    ///
    /// The closest level may be coarser than requested: with levels at 1x and
    /// 4x, a factor of 3.5 picks the 4x level, where a "largest downsample not
    /// above the factor" rule would pick 1x. Ties go to the lower index
    /// (higher resolution). Returns `None` for a non-positive or non-finite
    /// factor, or a slide without levels.
    fn best_level_for_downsample(&self, downsample: f64) -> Option<usize> {
        if !downsample.is_finite() || downsample <= 0.0 {
            return None;
        }

        (0..self.level_count())
            .filter_map(|level| {
                self.level_downsample(level)
                    .map(|ds| (level, (ds - downsample).abs()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(level, _)| level)
    }

    /// Names of the associated images, in the order the file stores them.
    fn associated_image_names(&self) -> &[String];

    /// Dimensions of an associated image.
    fn associated_image_dimensions(&self, name: &str) -> Option<(u32, u32)>;

    /// All slide properties.
    fn properties(&self) -> &SlideProperties;

    /// Read a `width x height` region of `level` into `dest`.
    ///
    /// `(x0, y0)` is the top-left corner in **level-0** coordinates; `width`
    /// and `height` are in the level's own pixels. Pixels outside the level
    /// are written as `0`.
    fn read_region(
        &self,
        dest: &mut [u32],
        x0: i64,
        y0: i64,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<(), SlideError>;

    /// Read a whole associated image into `dest`.
    fn read_associated_image(&self, name: &str, dest: &mut [u32]) -> Result<(), SlideError>;
}

/// Convert a level-0 coordinate into the pixel space of a level.
#[inline]
pub fn to_level_coordinate(level0: i64, downsample: f64) -> i64 {
    (level0 as f64 / downsample).round() as i64
}

// =============================================================================
// Tests
// =============================================================================
