//! Abbreviated JPEG stream handling.
//!
//! SVS tiles are usually "abbreviated" JPEG streams: they carry the scan but
//! not the quantization (DQT) and Huffman (DHT) tables, which are stored once
//! in the TIFF `JPEGTables` tag. Before decoding, the two are spliced:
//!
//! ```text
//! tables: SOI DQT DHT ... EOI        tile: SOI SOF SOS <scan> EOI
//! merged: SOI DQT DHT ... SOF SOS <scan> EOI
//! ```

use bytes::{Bytes, BytesMut};

// =============================================================================
// JPEG Markers
// =============================================================================

/// Start Of Image
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image
pub const EOI: [u8; 2] = [0xFF, 0xD9];

const DHT: u8 = 0xC4;
const DQT: u8 = 0xDB;
const SOS: u8 = 0xDA;

// =============================================================================
// Stream inspection
// =============================================================================

/// Which tables appear in the header segments before the first scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HeaderTables {
    quantization: bool,
    huffman: bool,
    reached_scan: bool,
}

/// Walk marker segments from SOI up to the first SOS.
fn scan_header(data: &[u8]) -> Option<HeaderTables> {
    if data.len() < 4 || data[..2] != SOI {
        return None;
    }

    let mut found = HeaderTables::default();
    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            // Fill bytes and standalone markers have no length field
            0xFF => pos += 1,
            0x00 | 0x01 | 0xD0..=0xD8 => pos += 2,
            SOS => {
                found.reached_scan = true;
                break;
            }
            marker => {
                if marker == DQT {
                    found.quantization = true;
                } else if marker == DHT {
                    found.huffman = true;
                }
                if pos + 3 >= data.len() {
                    break;
                }
                let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + length.max(2);
            }
        }
    }
    Some(found)
}

/// Whether a stream reaches its scan without both DQT and DHT tables.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    matches!(
        scan_header(data),
        Some(h) if h.reached_scan && !(h.quantization && h.huffman)
    )
}

// =============================================================================
// JPEG Tables Merging
// =============================================================================

/// Splice `tables` (SOI..EOI) in front of an abbreviated tile stream.
pub fn merge_jpeg_tables(tables: &[u8], tile_data: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile_data);
    }
    if tile_data.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI).unwrap_or(tables);
    let tile = tile_data.strip_prefix(&SOI).unwrap_or(tile_data);

    let mut merged = BytesMut::with_capacity(tables.len() + tile.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(tile);
    merged.freeze()
}

/// Produce a self-contained JPEG stream for a tile.
///
/// Tables are merged only when the tile lacks its own.
pub fn prepare_tile_jpeg(tables: Option<&[u8]>, tile_data: &[u8]) -> Bytes {
    match tables {
        Some(tables) if is_abbreviated_stream(tile_data) => merge_jpeg_tables(tables, tile_data),
        _ => Bytes::copy_from_slice(tile_data),
    }
}

// =============================================================================
// Tests
// =============================================================================
