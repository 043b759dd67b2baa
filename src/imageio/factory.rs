//! Host-owned registry of [`ImageIo`] implementations.
//!
//! The registry holds named constructors and hands out a fresh reader for a
//! path. There is no process-wide instance; the host creates one and decides
//! when to register.

use std::path::Path;

use tracing::debug;

use super::adapter::SlideImageIo;
use super::ImageIo;

/// Registration name of [`SlideImageIo`].
pub const SLIDE_IO_NAME: &str = "SlideImageIo";

/// Builds a fresh, unconfigured reader.
pub type ImageIoConstructor = Box<dyn Fn() -> Box<dyn ImageIo>>;

/// Registry of image I/O constructors, queried in registration order.
#[derive(Default)]
pub struct ImageIoFactory {
    entries: Vec<(String, ImageIoConstructor)>,
}

impl ImageIoFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `name`.
    ///
    /// Returns `false` and keeps the existing entry if `name` is taken.
    pub fn register(&mut self, name: impl Into<String>, constructor: ImageIoConstructor) -> bool {
        let name = name.into();
        if self.is_registered(&name) {
            return false;
        }
        debug!(name = %name, "registered image I/O");
        self.entries.push((name, constructor));
        true
    }

    /// Register the whole-slide reader once.
    pub fn register_slide_io(&mut self) -> bool {
        self.register(
            SLIDE_IO_NAME,
            Box::new(|| Box::new(SlideImageIo::new()) as Box<dyn ImageIo>),
        )
    }

    pub fn unregister_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    pub fn registered_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// First registered reader that accepts `path`, with its file name set.
    pub fn create_reader_for(&self, path: &Path) -> Option<Box<dyn ImageIo>> {
        self.entries.iter().find_map(|(name, constructor)| {
            let mut io = constructor();
            if !io.can_read_file(path) {
                return None;
            }
            debug!(name = %name, path = %path.display(), "selected image I/O");
            io.set_file_name(path);
            Some(io)
        })
    }
}
