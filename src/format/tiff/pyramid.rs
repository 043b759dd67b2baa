//! TIFF pyramid level identification.
//!
//! A slide file carries several IFDs. The tiled ones whose sizes shrink by
//! roughly powers of two form the resolution pyramid; everything else
//! (thumbnail, label, macro) is kept aside for the format readers to classify.
//!
//! Both tiles and strips are described by [`TileGrid`]: a strip is a tile as
//! wide as the image. This lets one compositing path serve pyramid levels and
//! stripped associated images alike.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{uniform_depth, ByteOrder, Ifd, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::{Compression, TiffTag};
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs to follow (safety limit)
const MAX_IFDS: usize = 100;

// =============================================================================
// TileGrid
// =============================================================================

/// Block layout of one IFD's pixel data.
#[derive(Debug, Clone)]
pub struct TileGrid {
    /// Index of the IFD in the file's IFD chain
    pub ifd_index: usize,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Block width (the image width for strips)
    pub tile_width: u32,

    /// Block height (RowsPerStrip for strips)
    pub tile_height: u32,

    pub tiles_x: u32,
    pub tiles_y: u32,

    /// Raw Compression tag value
    pub compression: u16,

    /// Samples per pixel
    pub samples_per_pixel: u16,

    /// Depth shared by every sample, `None` when the depths differ or are
    /// still unread
    pub bits_per_sample: Option<u16>,

    /// PlanarConfiguration (1 = interleaved, 2 = one plane per sample)
    pub planar_config: u16,

    /// PhotometricInterpretation, when present
    pub photometric: Option<u16>,

    /// Whether blocks are strips rather than tiles
    pub is_stripped: bool,

    /// The parsed IFD
    pub ifd: Ifd,
}

impl TileGrid {
    /// Describe the blocks of a tiled or stripped IFD.
    ///
    /// Returns `None` when the IFD has no usable dimensions or block layout.
    pub fn from_ifd(ifd: Ifd, ifd_index: usize, byte_order: ByteOrder) -> Option<Self> {
        let width = ifd.image_width(byte_order).filter(|&w| w > 0)?;
        let height = ifd.image_height(byte_order).filter(|&h| h > 0)?;

        let (tile_width, tile_height, is_stripped) = if ifd.is_tiled() {
            (ifd.tile_width(byte_order)?, ifd.tile_height(byte_order)?, false)
        } else if ifd.is_stripped() {
            let rows = ifd.rows_per_strip(byte_order).unwrap_or(height).clamp(1, height);
            (width, rows, true)
        } else {
            return None;
        };
        if tile_width == 0 || tile_height == 0 {
            return None;
        }

        Some(TileGrid {
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width),
            tiles_y: height.div_ceil(tile_height),
            compression: ifd.compression(byte_order),
            samples_per_pixel: ifd.samples_per_pixel(byte_order),
            bits_per_sample: ifd.bits_per_sample(byte_order),
            planar_config: ifd.planar_configuration(byte_order),
            photometric: ifd.photometric(byte_order),
            is_stripped,
            ifd,
        })
    }

    /// Read BitsPerSample when it is stored out of line.
    pub fn load_bits_per_sample<R: RangeReader + ?Sized>(
        &mut self,
        reader: &R,
        header: &TiffHeader,
    ) -> Result<(), TiffError> {
        if let Some(entry) = self.ifd.get_entry_by_tag(TiffTag::BitsPerSample) {
            if !entry.is_inline {
                let depths = ValueReader::new(reader, header).read_u64_array(entry)?;
                self.bits_per_sample = uniform_depth(depths);
            }
        }
        Ok(())
    }

    /// Why the block decoder cannot handle this grid's samples, if it cannot.
    ///
    /// Only 8-bit interleaved samples decode. Uncompressed blocks must also be
    /// gray (BlackIsZero or WhiteIsZero), RGB or RGBA.
    pub fn unsupported_sample_layout(&self) -> Option<String> {
        match self.bits_per_sample {
            Some(8) => {}
            Some(bits) => return Some(format!("{} bits per sample", bits)),
            None => return Some("mixed bits per sample".to_string()),
        }
        if self.planar_config != 1 {
            return Some(format!("planar configuration {}", self.planar_config));
        }
        if self.compression != Compression::None as u16 {
            return None;
        }

        let spp = self.samples_per_pixel;
        match (spp, self.photometric) {
            (1, None | Some(0) | Some(1)) | (3 | 4, None | Some(2)) => None,
            (1 | 3 | 4, Some(photometric)) => Some(format!(
                "photometric interpretation {} with {} samples per pixel",
                photometric, spp
            )),
            _ => Some(format!("{} samples per pixel", spp)),
        }
    }

    /// Total number of blocks.
    pub fn tile_count(&self) -> u64 {
        self.tiles_x as u64 * self.tiles_y as u64
    }

    /// Whether both block offset and byte count tags are present.
    pub fn has_tile_data(&self) -> bool {
        let (offsets, counts) = self.data_tags();
        self.ifd.get_entry_by_tag(offsets).is_some() && self.ifd.get_entry_by_tag(counts).is_some()
    }

    fn data_tags(&self) -> (TiffTag, TiffTag) {
        if self.is_stripped {
            (TiffTag::StripOffsets, TiffTag::StripByteCounts)
        } else {
            (TiffTag::TileOffsets, TiffTag::TileByteCounts)
        }
    }

    /// Row-major index of the block at `(tile_x, tile_y)`.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<usize> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y as usize * self.tiles_x as usize + tile_x as usize)
    }

    /// Pixel size of the part of a block that lies inside the image.
    pub fn tile_dimensions(&self, tile_x: u32, tile_y: u32) -> Option<(u32, u32)> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        let w = (self.width - tile_x * self.tile_width).min(self.tile_width);
        let h = (self.height - tile_y * self.tile_height).min(self.tile_height);
        Some((w, h))
    }
}

// =============================================================================
// PyramidLevel
// =============================================================================

/// A single resolution level.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Index in the pyramid (0 = highest resolution)
    pub level_index: usize,

    /// Downsample factor relative to level 0
    pub downsample: f64,

    /// Tile layout of this level
    pub grid: TileGrid,
}

impl PyramidLevel {
    pub fn width(&self) -> u32 {
        self.grid.width
    }

    pub fn height(&self) -> u32 {
        self.grid.height
    }
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// Pyramid levels of a TIFF file plus the IFDs that are not part of it.
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,

    /// Levels sorted by resolution (0 = highest)
    pub levels: Vec<PyramidLevel>,

    /// Non-pyramid IFDs with their chain index, in file order
    pub other_ifds: Vec<(usize, Ifd)>,
}

impl TiffPyramid {
    /// Read the header and the IFD chain, then identify pyramid levels.
    pub fn parse<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, TiffError> {
        let header_len = (BIGTIFF_HEADER_SIZE as u64).min(reader.size()) as usize;
        let header_bytes = reader.read_exact_at(0, header_len)?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header)?;
        debug!(
            file = reader.identifier(),
            ifd_count = ifds.len(),
            bigtiff = header.is_bigtiff,
            "parsed TIFF directory chain"
        );

        let mut pyramid = Self::build_pyramid(header, ifds);
        for level in &mut pyramid.levels {
            level.grid.load_bits_per_sample(reader, &pyramid.header)?;
        }
        Ok(pyramid)
    }

    /// Follow the next-IFD chain, stopping at a cycle or the IFD limit.
    pub fn parse_all_ifds<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS && seen.insert(offset) {
            let ifd = Self::read_ifd(reader, header, offset)?;
            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    /// Read the IFD at `offset`: its entry count first, then the whole IFD.
    pub fn read_ifd<R: RangeReader + ?Sized>(
        reader: &R,
        header: &TiffHeader,
        offset: u64,
    ) -> Result<Ifd, TiffError> {
        if offset >= reader.size() {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        let count_bytes = reader.read_exact_at(offset, header.ifd_count_size())?;
        let entry_count = if header.is_bigtiff {
            header.byte_order.read_u64(&count_bytes)
        } else {
            header.byte_order.read_u16(&count_bytes) as u64
        };

        let ifd_bytes = reader.read_exact_at(offset, Ifd::calculate_size(entry_count, header))?;
        Ifd::parse(&ifd_bytes, header)
    }

    fn build_pyramid(header: TiffHeader, ifds: Vec<Ifd>) -> Self {
        let byte_order = header.byte_order;
        let mut candidates: Vec<TileGrid> = Vec::new();
        let mut other_ifds = Vec::new();

        for (ifd_index, ifd) in ifds.into_iter().enumerate() {
            if !ifd.is_tiled() {
                other_ifds.push((ifd_index, ifd));
                continue;
            }
            match TileGrid::from_ifd(ifd.clone(), ifd_index, byte_order) {
                Some(grid) if grid.has_tile_data() => candidates.push(grid),
                _ => other_ifds.push((ifd_index, ifd)),
            }
        }

        // Largest first; the stable sort keeps file order for equal areas
        candidates.sort_by_key(|g| std::cmp::Reverse(g.width as u64 * g.height as u64));

        let mut levels: Vec<PyramidLevel> = Vec::new();
        for grid in candidates {
            let downsample = match levels.first() {
                None => 1.0,
                Some(base) => {
                    let dx = base.width() as f64 / grid.width as f64;
                    let dy = base.height() as f64 / grid.height as f64;
                    (dx + dy) / 2.0
                }
            };

            if Self::is_valid_downsample(downsample, levels.len()) {
                levels.push(PyramidLevel {
                    level_index: levels.len(),
                    downsample,
                    grid,
                });
            } else {
                debug!(
                    ifd_index = grid.ifd_index,
                    downsample, "tiled IFD does not fit the pyramid"
                );
                other_ifds.push((grid.ifd_index, grid.ifd));
            }
        }
        other_ifds.sort_by_key(|(index, _)| *index);

        TiffPyramid {
            header,
            levels,
            other_ifds,
        }
    }

    /// Whether a downsample is plausible for the level at `level_idx`.
    ///
    /// Level 0 must be ~1.0; later levels must be near a power of two, at
    /// least 2, within 20%.
    fn is_valid_downsample(downsample: f64, level_idx: usize) -> bool {
        if level_idx == 0 {
            return (downsample - 1.0).abs() < 0.1;
        }

        let exponent = downsample.log2().round();
        if exponent < 1.0 {
            return false;
        }
        let ratio = downsample / exponent.exp2();
        ratio > 0.8 && ratio < 1.2
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn get_level(&self, level: usize) -> Option<&PyramidLevel> {
        self.levels.get(level)
    }

    /// Dimensions of level 0.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.levels.first().map(|l| (l.width(), l.height()))
    }
}

// =============================================================================
// Tile Data Loading
// =============================================================================

/// Block locations of one [`TileGrid`].
#[derive(Debug, Clone)]
pub struct TileData {
    /// Byte offset of each block in the file
    pub offsets: Vec<u64>,

    /// Byte count of each block
    pub byte_counts: Vec<u64>,

    /// Shared JPEG tables, when present
    pub jpeg_tables: Option<Bytes>,
}

impl TileData {
    /// Load block offsets, byte counts and JPEG tables for a grid.
    pub fn load<R: RangeReader + ?Sized>(
        reader: &R,
        grid: &TileGrid,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);
        let (offsets_tag, counts_tag) = if grid.is_stripped {
            (("StripOffsets", TiffTag::StripOffsets), ("StripByteCounts", TiffTag::StripByteCounts))
        } else {
            (("TileOffsets", TiffTag::TileOffsets), ("TileByteCounts", TiffTag::TileByteCounts))
        };

        let offsets = match grid.ifd.get_entry_by_tag(offsets_tag.1) {
            Some(entry) => values.read_u64_array(entry)?,
            None => return Err(TiffError::MissingTag(offsets_tag.0)),
        };
        let byte_counts = match grid.ifd.get_entry_by_tag(counts_tag.1) {
            Some(entry) => values.read_u64_array(entry)?,
            None => return Err(TiffError::MissingTag(counts_tag.0)),
        };

        let expected = grid.tile_count();
        if (offsets.len() as u64) < expected || (byte_counts.len() as u64) < expected {
            return Err(TiffError::InvalidTagValue {
                tag: offsets_tag.0,
                message: format!(
                    "expected {} entries, found {} offsets and {} byte counts",
                    expected,
                    offsets.len(),
                    byte_counts.len()
                ),
            });
        }

        let jpeg_tables = match grid.ifd.get_entry_by_tag(TiffTag::JpegTables) {
            Some(entry) => Some(values.read_bytes(entry)?),
            None => None,
        };

        Ok(TileData {
            offsets,
            byte_counts,
            jpeg_tables,
        })
    }

    /// Offset and size of a block.
    pub fn get_tile_location(&self, tile_index: usize) -> Option<(u64, u64)> {
        Some((
            *self.offsets.get(tile_index)?,
            *self.byte_counts.get(tile_index)?,
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
