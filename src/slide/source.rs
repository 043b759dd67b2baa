//! Opening slides.
//!
//! A [`SlideSource`] turns a path into an open [`SlideReader`]. The session
//! layer only ever talks to a source, which lets tests substitute slides that
//! never touch the filesystem.

use std::path::Path;

use tracing::debug;

use crate::error::SlideError;
use crate::format::{detect_format, GenericTiffReader, SlideFormat, SvsReader};
use crate::io::{FileRangeReader, RangeReader};

use super::reader::SlideReader;

/// Something that can open slides by path.
pub trait SlideSource {
    /// Open the slide at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn SlideReader>, SlideError>;
}

/// Opens slides from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSlideSource;

impl SlideSource for LocalSlideSource {
    fn open(&self, path: &Path) -> Result<Box<dyn SlideReader>, SlideError> {
        let reader = FileRangeReader::open(path)?;
        open_slide(reader)
    }
}

/// Detect the format behind `reader` and open it with the matching parser.
pub fn open_slide<R: RangeReader + 'static>(reader: R) -> Result<Box<dyn SlideReader>, SlideError> {
    let format = detect_format(&reader)?;
    debug!(file = reader.identifier(), format = format.name(), "detected slide format");

    let slide: Box<dyn SlideReader> = match format {
        SlideFormat::AperioSvs => Box::new(SvsReader::open(reader)?),
        SlideFormat::GenericTiff => Box::new(GenericTiffReader::open(reader)?),
    };
    Ok(slide)
}
