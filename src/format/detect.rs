//! Format detection for Whole Slide Image files.
//!
//! Two checks are offered. [`has_supported_extension`] is a cheap filename
//! pre-check; [`detect_format`] and [`detect_vendor`] inspect the file itself:
//!
//! - **Aperio SVS**: tiled TIFF whose first ImageDescription contains "Aperio"
//! - **Generic Pyramidal TIFF**: any other TIFF whose first image is tiled

use std::path::Path;

use tracing::debug;

use crate::error::FormatError;
use crate::io::{FileRangeReader, RangeReader};

use super::tiff::{ByteOrder, TiffHeader, TiffPyramid, TiffTag, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};

// =============================================================================
// SlideFormat
// =============================================================================

/// Detected slide format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideFormat {
    /// Aperio SVS (TIFF with an Aperio ImageDescription)
    AperioSvs,

    /// Generic tiled pyramidal TIFF
    GenericTiff,
}

impl SlideFormat {
    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "Aperio SVS",
            SlideFormat::GenericTiff => "Generic Pyramidal TIFF",
        }
    }

    /// Vendor string reported by the backend for this format.
    pub const fn vendor(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "aperio",
            SlideFormat::GenericTiff => "generic-tiff",
        }
    }
}

// =============================================================================
// Extension pre-check
// =============================================================================

/// Filename suffixes of the whole-slide formats worth probing.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".tif", ".tiff", ".svs", ".vms", ".vmu", ".ndpi", ".scn", ".mrxs", ".svslide", ".bif",
];

/// Whether `path` ends in one of [`SUPPORTED_EXTENSIONS`], ignoring case.
pub fn has_supported_extension(path: impl AsRef<Path>) -> bool {
    let name = path.as_ref().to_string_lossy().to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

// =============================================================================
// Format Detection
// =============================================================================

/// Bytes of ImageDescription inspected for vendor markers.
const MAX_DESCRIPTION_BYTES: usize = 1024;

const APERIO_MARKER: &[u8] = b"Aperio";

/// Detect the format of a slide.
///
/// Reads the header and the first IFD only; the rest of the directory chain
/// is parsed when the slide is opened.
pub fn detect_format<R: RangeReader + ?Sized>(reader: &R) -> Result<SlideFormat, FormatError> {
    let header_len = (BIGTIFF_HEADER_SIZE as u64).min(reader.size()) as usize;
    let header_bytes = reader.read_exact_at(0, header_len)?;
    if !is_tiff_header(&header_bytes) {
        return Err(FormatError::UnsupportedFormat {
            reason: "Not a TIFF file".to_string(),
        });
    }

    let header = TiffHeader::parse(&header_bytes, reader.size())?;
    let ifd = TiffPyramid::read_ifd(reader, &header, header.first_ifd_offset)?;

    if !ifd.is_tiled() {
        return Err(FormatError::UnsupportedFormat {
            reason: "First TIFF image is not tiled".to_string(),
        });
    }

    let description = match ifd.get_entry_by_tag(TiffTag::ImageDescription) {
        Some(entry) if entry.count > 0 => {
            let len = (entry.count as usize).min(MAX_DESCRIPTION_BYTES);
            if entry.is_inline {
                entry.value_offset_bytes[..len.min(entry.value_offset_bytes.len())].to_vec()
            } else {
                let offset = entry.value_offset(header.byte_order);
                reader.read_exact_at(offset, len)?.to_vec()
            }
        }
        _ => Vec::new(),
    };

    if contains_aperio_marker(&description) {
        Ok(SlideFormat::AperioSvs)
    } else {
        Ok(SlideFormat::GenericTiff)
    }
}

/// Inspect a file and return its vendor string, or `None` if unreadable.
pub fn detect_vendor(path: impl AsRef<Path>) -> Option<&'static str> {
    let path = path.as_ref();
    let result = FileRangeReader::open(path)
        .map_err(FormatError::from)
        .and_then(|reader| detect_format(&reader));

    match result {
        Ok(format) => Some(format.vendor()),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "vendor detection rejected file");
            None
        }
    }
}

fn contains_aperio_marker(data: &[u8]) -> bool {
    data.windows(APERIO_MARKER.len())
        .any(|window| window == APERIO_MARKER)
}

/// Quick check for TIFF or BigTIFF magic.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let byte_order = match &bytes[..2] {
        b"II" => ByteOrder::LittleEndian,
        b"MM" => ByteOrder::BigEndian,
        _ => return false,
    };
    matches!(byte_order.read_u16(&bytes[2..]), 42 | 43)
}

// =============================================================================
// Tests
// =============================================================================
