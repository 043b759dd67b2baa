//! Tile and strip decoding into packed ARGB pixels.
//!
//! Every block is expanded to `u32` pixels laid out as `a<<24 | r<<16 | g<<8 | b`,
//! the order the rest of the backend works in.
//!
//! - **Uncompressed**: 8-bit interleaved gray, RGB or RGBA samples. Gray
//!   stored as WhiteIsZero is inverted.
//! - **JPEG**: abbreviated streams are completed with the level's JPEGTables
//!   and decoded with the `image` crate.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::error::SlideError;
use crate::format::jpeg::prepare_tile_jpeg;
use crate::format::tiff::Compression;

const PHOTOMETRIC_WHITE_IS_ZERO: u16 = 0;

/// Pack 8-bit channels into the backend's ARGB word.
#[inline]
pub const fn pack_argb(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// A decoded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTile {
    pub width: u32,
    pub height: u32,

    /// Row-major ARGB pixels, `width * height` long
    pub pixels: Vec<u32>,
}

/// How a block is encoded.
#[derive(Debug, Clone, Copy)]
pub struct BlockEncoding<'a> {
    /// Raw Compression tag value
    pub compression: u16,

    /// Interleaved samples per pixel (uncompressed data only)
    pub samples_per_pixel: u16,

    /// PhotometricInterpretation (uncompressed data only)
    pub photometric: Option<u16>,

    /// Shared JPEG tables
    pub jpeg_tables: Option<&'a [u8]>,
}

/// Decode one block stored as `width x height` pixels.
///
/// JPEG blocks report their own size, which normally equals the stored one.
pub fn decode_block(
    data: &[u8],
    encoding: &BlockEncoding<'_>,
    width: u32,
    height: u32,
) -> Result<DecodedTile, SlideError> {
    match Compression::from_u16(encoding.compression) {
        Some(Compression::None) => decode_raw(data, encoding, width, height),
        Some(Compression::Jpeg) => decode_jpeg(data, encoding.jpeg_tables),
        _ => Err(SlideError::Decode {
            message: format!(
                "cannot decode {} compressed data",
                Compression::describe(encoding.compression)
            ),
        }),
    }
}

fn decode_raw(
    data: &[u8],
    encoding: &BlockEncoding<'_>,
    width: u32,
    height: u32,
) -> Result<DecodedTile, SlideError> {
    let pixel_count = width as usize * height as usize;
    let spp = encoding.samples_per_pixel as usize;
    let white_is_zero = encoding.photometric == Some(PHOTOMETRIC_WHITE_IS_ZERO);
    if !matches!(spp, 1 | 3 | 4) {
        return Err(SlideError::Decode {
            message: format!("unsupported samples per pixel: {}", spp),
        });
    }

    let needed = pixel_count * spp;
    if data.len() < needed {
        return Err(SlideError::Decode {
            message: format!("block truncated: need {} bytes, got {}", needed, data.len()),
        });
    }

    let pixels = data[..needed]
        .chunks_exact(spp)
        .map(|s| match s {
            [v] if white_is_zero => pack_argb(!*v, !*v, !*v, 0xFF),
            [v] => pack_argb(*v, *v, *v, 0xFF),
            [r, g, b] => pack_argb(*r, *g, *b, 0xFF),
            [r, g, b, a] => pack_argb(*r, *g, *b, *a),
            _ => 0,
        })
        .collect();

    Ok(DecodedTile {
        width,
        height,
        pixels,
    })
}

fn decode_jpeg(data: &[u8], tables: Option<&[u8]>) -> Result<DecodedTile, SlideError> {
    let stream = prepare_tile_jpeg(tables, data);
    let image = ImageReader::with_format(Cursor::new(&stream[..]), ImageFormat::Jpeg)
        .decode()
        .map_err(|e| SlideError::Decode {
            message: e.to_string(),
        })?
        .to_rgba8();

    let (width, height) = image.dimensions();
    let pixels = image
        .pixels()
        .map(|p| pack_argb(p[0], p[1], p[2], p[3]))
        .collect();

    Ok(DecodedTile {
        width,
        height,
        pixels,
    })
}

// =============================================================================
// Tests
// =============================================================================
