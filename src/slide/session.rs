//! Backend session.
//!
//! A [`BackendSession`] owns at most one open slide and answers geometry,
//! metadata and pixel queries against it. Queries on a closed session fail
//! quietly (`None`, `-1` or an empty list); only a failed open is remembered
//! as an error message.
//!
//! Region reads take coordinates in the selected level's own pixel space and
//! scale the origin to level 0 before handing it to the slide reader. The
//! width and height are already level-native and pass through unchanged.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::reader::{
    SlideProperties, SlideReader, PROPERTY_BOUNDS_X, PROPERTY_BOUNDS_Y, PROPERTY_MPP_X,
    PROPERTY_MPP_Y,
};
use super::source::{LocalSlideSource, SlideSource};

// =============================================================================
// Selection
// =============================================================================

/// The raster a query or read operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A pyramid level; 0 is full resolution
    Level(usize),

    /// An associated image, by name
    AssociatedImage(String),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Level(0)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Level(level) => write!(f, "level {}", level),
            Selection::AssociatedImage(name) => write!(f, "associated image '{}'", name),
        }
    }
}

// =============================================================================
// BackendSession
// =============================================================================

/// Owner of one open slide.
pub struct BackendSession<S: SlideSource = LocalSlideSource> {
    source: S,
    slide: Option<Box<dyn SlideReader>>,
    path: Option<PathBuf>,
    last_error: Option<String>,
}

impl BackendSession<LocalSlideSource> {
    /// A closed session that opens slides from the local filesystem.
    pub fn new() -> Self {
        Self::with_source(LocalSlideSource)
    }
}

impl Default for BackendSession<LocalSlideSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SlideSource> BackendSession<S> {
    /// A closed session that opens slides through `source`.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            slide: None,
            path: None,
            last_error: None,
        }
    }

    /// Close any open slide, then open `path`.
    ///
    /// Returns whether the new slide is open. On failure the reason is
    /// available from [`last_error`](Self::last_error).
    pub fn open(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.close();

        match self.source.open(path) {
            Ok(slide) => {
                debug!(
                    path = %path.display(),
                    vendor = slide.vendor(),
                    levels = slide.level_count(),
                    "opened slide"
                );
                self.slide = Some(slide);
                self.path = Some(path.to_path_buf());
                self.last_error = None;
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to open slide");
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    /// Release the slide, if one is open.
    pub fn close(&mut self) {
        if self.slide.take().is_some() {
            debug!(path = ?self.path, "closed slide");
        }
        self.path = None;
    }

    pub fn is_open(&self) -> bool {
        self.slide.is_some()
    }

    /// Path of the open slide.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reason the last `open` failed, cleared by a successful open.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn vendor(&self) -> Option<String> {
        self.slide.as_ref().map(|s| s.vendor().to_string())
    }

    /// Number of levels, or `-1` when closed.
    pub fn level_count(&self) -> i64 {
        self.slide.as_ref().map_or(-1, |s| s.level_count() as i64)
    }

    /// Best level for a downsample factor, or `-1` when there is none.
    pub fn best_level_for_downsample(&self, downsample: f64) -> i64 {
        self.slide
            .as_ref()
            .and_then(|s| s.best_level_for_downsample(downsample))
            .map_or(-1, |level| level as i64)
    }

    pub fn level_downsample(&self, level: usize) -> Option<f64> {
        self.slide.as_ref()?.level_downsample(level)
    }

    /// Dimensions of the selected raster in its own pixels.
    pub fn dimensions(&self, selection: &Selection) -> Option<(u64, u64)> {
        let slide = self.slide.as_ref()?;
        let (width, height) = match selection {
            Selection::Level(level) => slide.level_dimensions(*level)?,
            Selection::AssociatedImage(name) => slide.associated_image_dimensions(name)?,
        };
        Some((width as u64, height as u64))
    }

    /// Microns per pixel of a level.
    ///
    /// Associated images have no meaningful spacing and always yield `None`,
    /// as does a slide without resolution properties.
    pub fn spacing(&self, selection: &Selection) -> Option<(f64, f64)> {
        let Selection::Level(level) = selection else {
            return None;
        };
        let slide = self.slide.as_ref()?;
        let downsample = slide.level_downsample(*level)?;
        let mpp_x = parse_property(slide.properties(), PROPERTY_MPP_X)?;
        let mpp_y = parse_property(slide.properties(), PROPERTY_MPP_Y)?;
        Some((mpp_x * downsample, mpp_y * downsample))
    }

    /// Bounds offset reported by the slide, `(0, 0)` when absent.
    pub fn origin(&self, selection: &Selection) -> (f64, f64) {
        match (selection, self.slide.as_ref()) {
            (Selection::Level(_), Some(slide)) => {
                let properties = slide.properties();
                (
                    parse_property(properties, PROPERTY_BOUNDS_X).unwrap_or(0.0),
                    parse_property(properties, PROPERTY_BOUNDS_Y).unwrap_or(0.0),
                )
            }
            _ => (0.0, 0.0),
        }
    }

    pub fn associated_image_names(&self) -> Vec<String> {
        self.slide
            .as_ref()
            .map(|s| s.associated_image_names().to_vec())
            .unwrap_or_default()
    }

    pub fn property_names(&self) -> Vec<String> {
        self.slide
            .as_ref()
            .map(|s| s.properties().keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn property_value(&self, name: &str) -> Option<String> {
        self.slide.as_ref()?.properties().get(name).cloned()
    }

    /// Read pixels of the selected raster into `dest`.
    ///
    /// For a level, `(x, y)` is in that level's pixels and is scaled to level 0
    /// by the level's downsample. For an associated image the whole image is
    /// written and the rectangle is ignored.
    ///
    /// Returns `None` on success, or the error message.
    pub fn read_region(
        &self,
        dest: &mut [u32],
        x: i64,
        y: i64,
        width: u64,
        height: u64,
        selection: &Selection,
    ) -> Option<String> {
        let Some(slide) = self.slide.as_ref() else {
            return Some("slide is not open".to_string());
        };

        let result = match selection {
            Selection::Level(level) => {
                let Some(downsample) = slide.level_downsample(*level) else {
                    return Some(format!(
                        "level {} out of range (slide has {} levels)",
                        level,
                        slide.level_count()
                    ));
                };
                let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
                    return Some(format!("region of {}x{} pixels is too large", width, height));
                };
                let x0 = (x as f64 * downsample).round() as i64;
                let y0 = (y as f64 * downsample).round() as i64;
                slide.read_region(dest, x0, y0, *level, width, height)
            }
            Selection::AssociatedImage(name) => slide.read_associated_image(name, dest),
        };

        result.err().map(|err| {
            warn!(path = ?self.path, selection = %selection, error = %err, "region read failed");
            err.to_string()
        })
    }

    /// Borrow the open slide.
    pub fn slide(&self) -> Option<&dyn SlideReader> {
        self.slide.as_deref()
    }
}

fn parse_property(properties: &SlideProperties, name: &str) -> Option<f64> {
    properties.get(name)?.trim().parse().ok()
}

// =============================================================================
// Tests
// =============================================================================
