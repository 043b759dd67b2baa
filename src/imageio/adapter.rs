//! Region adapter over a backend session.
//!
//! [`SlideImageIo`] tracks the current [`Selection`], captures geometry and
//! metadata for it, and serves region reads in the selection's own pixel
//! space. Output pixels are RGBA8.
//!
//! Selection changes only take effect for geometry after the next
//! [`read_image_information`](ImageIo::read_image_information), which also
//! reopens the file. A failed pixel read closes the session; reads then fail
//! with [`ImageIoError::ResourceUnavailable`] until information is read again.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::ImageIoError;
use crate::format::{detect_vendor, has_supported_extension};
use crate::slide::{BackendSession, LocalSlideSource, SlideSource};

use super::factory::SLIDE_IO_NAME;
use super::pixel::remap_argb_to_rgba;
use super::{ImageIo, MetadataMap, RasterDescriptor, RegionRequest, Selection};

/// Where the adapter is in its open / fail / reopen cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Image information has never been read successfully
    Unopened,

    /// Geometry is current and the session is open
    Opened,

    /// A fatal error closed the session
    Invalidated,
}

/// [`ImageIo`] implementation for whole-slide images.
pub struct SlideImageIo<S: SlideSource = LocalSlideSource> {
    session: BackendSession<S>,
    file_name: Option<PathBuf>,
    selection: Selection,
    state: AdapterState,
    descriptor: Option<RasterDescriptor>,
    metadata: MetadataMap,
}

impl SlideImageIo<LocalSlideSource> {
    pub fn new() -> Self {
        Self::with_session(BackendSession::new())
    }
}

impl Default for SlideImageIo<LocalSlideSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SlideSource> SlideImageIo<S> {
    /// Wrap an existing (normally closed) session.
    pub fn with_session(session: BackendSession<S>) -> Self {
        Self {
            session,
            file_name: None,
            selection: Selection::default(),
            state: AdapterState::Unopened,
            descriptor: None,
            metadata: MetadataMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Select a pyramid level.
    pub fn set_level(&mut self, level: usize) {
        debug!(level, "selecting level");
        self.selection = Selection::Level(level);
    }

    /// Select an associated image. The name is checked when it is read.
    pub fn set_associated_image(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(name = %name, "selecting associated image");
        self.selection = Selection::AssociatedImage(name);
    }

    /// Select the level closest to `downsample`.
    ///
    /// Needs an open session. On failure the selection is unchanged.
    pub fn set_level_for_downsample(&mut self, downsample: f64) -> Result<usize, ImageIoError> {
        let level = self.session.best_level_for_downsample(downsample);
        let level = usize::try_from(level).map_err(|_| ImageIoError::UnknownSelection { downsample })?;
        self.set_level(level);
        Ok(level)
    }

    /// Selected level, if a level is selected.
    pub fn level(&self) -> Option<usize> {
        match self.selection {
            Selection::Level(level) => Some(level),
            Selection::AssociatedImage(_) => None,
        }
    }

    /// Selected associated image, if one is selected.
    pub fn associated_image_name(&self) -> Option<&str> {
        match &self.selection {
            Selection::Level(_) => None,
            Selection::AssociatedImage(name) => Some(name),
        }
    }

    // -------------------------------------------------------------------------
    // Captured information
    // -------------------------------------------------------------------------

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn session(&self) -> &BackendSession<S> {
        &self.session
    }

    pub fn dimensions(&self) -> Option<(u64, u64)> {
        self.descriptor.map(|d| (d.width, d.height))
    }

    pub fn spacing(&self) -> Option<(f64, f64)> {
        self.descriptor.map(|d| (d.spacing_x, d.spacing_y))
    }

    pub fn origin(&self) -> Option<(f64, f64)> {
        self.descriptor.map(|d| (d.origin_x, d.origin_y))
    }

    /// Number of levels, or `-1` when the session is closed.
    pub fn level_count(&self) -> i64 {
        self.session.level_count()
    }

    /// Downsample of the selected level.
    pub fn level_downsample(&self) -> Option<f64> {
        self.session.level_downsample(self.level()?)
    }

    pub fn vendor(&self) -> Option<String> {
        self.session.vendor()
    }

    pub fn associated_image_names(&self) -> Vec<String> {
        self.session.associated_image_names()
    }

    /// Size of the selected raster as RGBA8.
    pub fn image_size_in_bytes(&self) -> Option<u64> {
        let (width, height) = self.dimensions()?;
        width.checked_mul(height)?.checked_mul(4)
    }

    fn path_string(&self) -> String {
        self.file_name
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    fn invalidate(&mut self) {
        self.session.close();
        self.descriptor = None;
        self.state = AdapterState::Invalidated;
    }
}

impl<S: SlideSource> ImageIo for SlideImageIo<S> {
    fn name(&self) -> &'static str {
        SLIDE_IO_NAME
    }

    fn can_read_file(&self, path: &Path) -> bool {
        if !has_supported_extension(path) {
            return false;
        }
        detect_vendor(path).is_some()
    }

    fn set_file_name(&mut self, path: &Path) {
        self.file_name = Some(path.to_path_buf());
    }

    fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    fn read_image_information(&mut self) -> Result<(), ImageIoError> {
        let path = self.file_name.clone().ok_or(ImageIoError::NoFileName)?;

        if !self.session.open(&path) {
            self.invalidate();
            return Err(ImageIoError::OpenFailed {
                path: path.display().to_string(),
                reason: self.session.last_error().unwrap_or("unknown error").to_string(),
            });
        }

        let Some((width, height)) = self.session.dimensions(&self.selection) else {
            self.invalidate();
            return Err(ImageIoError::DimensionsUnavailable {
                path: path.display().to_string(),
                selection: self.selection.to_string(),
            });
        };

        let mut descriptor = RasterDescriptor::with_size(width, height);
        if let Some((spacing_x, spacing_y)) = self.session.spacing(&self.selection) {
            descriptor.spacing_x = spacing_x;
            descriptor.spacing_y = spacing_y;
        }
        let (origin_x, origin_y) = self.session.origin(&self.selection);
        descriptor.origin_x = origin_x;
        descriptor.origin_y = origin_y;

        self.metadata = self
            .session
            .property_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.session.property_value(&name)?;
                Some((name, value))
            })
            .collect();
        self.descriptor = Some(descriptor);
        self.state = AdapterState::Opened;

        debug!(
            path = %path.display(),
            selection = %self.selection,
            width,
            height,
            properties = self.metadata.len(),
            "read image information"
        );
        Ok(())
    }

    fn descriptor(&self) -> Option<RasterDescriptor> {
        self.descriptor
    }

    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn can_stream_read(&self) -> bool {
        matches!(self.selection, Selection::Level(_))
    }

    fn read_region(
        &mut self,
        buffer: &mut [u32],
        request: &RegionRequest,
    ) -> Result<(), ImageIoError> {
        let mut pixel_count = request.pixel_count()?;

        if self.state != AdapterState::Opened || !self.session.is_open() {
            return Err(ImageIoError::ResourceUnavailable {
                path: self.path_string(),
            });
        }

        // Associated images are always read whole
        if !self.can_stream_read() {
            if let Some((width, height)) = self.session.dimensions(&self.selection) {
                pixel_count = RegionRequest::whole(width, height).pixel_count()?;
            }
        }

        if buffer.len() < pixel_count {
            return Err(ImageIoError::BufferTooSmall {
                required: pixel_count,
                actual: buffer.len(),
            });
        }
        let pixels = &mut buffer[..pixel_count];

        if let Some(reason) = self.session.read_region(
            pixels,
            request.x,
            request.y,
            request.width,
            request.height,
            &self.selection,
        ) {
            let path = self.path_string();
            warn!(path = %path, reason = %reason, "closing slide after failed read");
            self.invalidate();
            return Err(ImageIoError::RegionReadFailed { path, reason });
        }

        remap_argb_to_rgba(pixels);
        trace!(pixels = pixel_count, selection = %self.selection, "remapped region");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
