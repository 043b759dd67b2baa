//! TIFF header and IFD parsing.
//!
//! ```text
//! Classic TIFF header (8 bytes)         BigTIFF header (16 bytes)
//!   0..2  byte order (II / MM)            0..2   byte order (II / MM)
//!   2..4  version 42                      2..4   version 43
//!   4..8  first IFD offset (u32)          4..6   offset byte size (8)
//!                                         6..8   reserved
//!                                         8..16  first IFD offset (u64)
//! ```
//!
//! An IFD is an entry count, a run of fixed-size entries, then the offset of
//! the next IFD (0 terminates the chain). Entry and field widths double in
//! BigTIFF; [`TiffHeader`] answers those layout questions for the parser.

use crate::error::TiffError;

use super::tags::{FieldType, ResolutionUnit, TiffTag};

// =============================================================================
// Constants
// =============================================================================

const MAGIC_LITTLE_ENDIAN: u16 = 0x4949;
const MAGIC_BIG_ENDIAN: u16 = 0x4D4D;

const VERSION_CLASSIC: u16 = 42;
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order declared by the first two bytes of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II"
    LittleEndian,
    /// "MM"
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the first two bytes of `bytes`.
    ///
    /// Panics if `bytes` is shorter than two bytes; callers slice from
    /// buffers whose length has already been checked.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Read a u32 from the first four bytes of `bytes`.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Read a u64 from the first eight bytes of `bytes`.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether offsets and counts are 64-bit
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a header from the first bytes of a file of `file_size` bytes.
    ///
    /// Pass at least [`BIGTIFF_HEADER_SIZE`] bytes when available; classic
    /// TIFF only needs [`TIFF_HEADER_SIZE`].
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            MAGIC_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            MAGIC_BIG_ENDIAN => ByteOrder::BigEndian,
            other => return Err(TiffError::InvalidMagic(other)),
        };

        let (is_bigtiff, first_ifd_offset) = match byte_order.read_u16(&bytes[2..]) {
            VERSION_CLASSIC => (false, byte_order.read_u32(&bytes[4..]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }
                let offset_size = byte_order.read_u16(&bytes[4..]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }
                (true, byte_order.read_u64(&bytes[8..]))
            }
            version => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Size of one IFD entry: 12 bytes classic, 20 bytes BigTIFF.
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count that opens an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of offsets, including the next-IFD link and entry value fields.
    #[inline]
    pub const fn offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// One 12- or 20-byte entry of an IFD.
///
/// The value field is kept raw. When the value fits in it, the field holds
/// the value itself; otherwise it holds the file offset of the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Numeric tag ID (may be a tag we do not interpret)
    pub tag_id: u16,

    /// Decoded field type, `None` when the type is not one we understand
    pub field_type: Option<FieldType>,

    /// Field type as stored in the file
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// Raw value/offset field (4 or 8 bytes)
    pub value_offset_bytes: Vec<u8>,

    /// Whether `value_offset_bytes` holds the value itself
    pub is_inline: bool,
}

impl IfdEntry {
    /// Total byte size of the value, or `None` for unknown field types.
    pub fn value_byte_size(&self) -> Option<u64> {
        let field_type = self.field_type?;
        (field_type.size_in_bytes() as u64).checked_mul(self.count)
    }

    /// Interpret the value field as a file offset.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.value_offset_bytes.len() >= 8 {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }

    /// Single inline Short or Long value.
    pub fn inline_u32(&self, byte_order: ByteOrder) -> Option<u32> {
        if !self.is_inline || self.count != 1 {
            return None;
        }
        match self.field_type? {
            FieldType::Short => Some(byte_order.read_u16(&self.value_offset_bytes) as u32),
            FieldType::Long => Some(byte_order.read_u32(&self.value_offset_bytes)),
            _ => None,
        }
    }

    /// Single inline Short, Long or Long8 value.
    pub fn inline_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        match self.field_type? {
            FieldType::Long8 if self.is_inline && self.count == 1 => {
                Some(byte_order.read_u64(&self.value_offset_bytes))
            }
            _ => self.inline_u32(byte_order).map(u64::from),
        }
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ifd {
    /// Entries in file order
    pub entries: Vec<IfdEntry>,

    /// Offset of the next IFD, 0 for the last one
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// An IFD with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Byte size of an IFD holding `entry_count` entries.
    ///
    /// Saturates instead of overflowing; an absurd count then fails the
    /// subsequent range read rather than wrapping.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> usize {
        let entries = entry_count.saturating_mul(header.ifd_entry_size() as u64);
        let total = entries
            .saturating_add(header.ifd_count_size() as u64)
            .saturating_add(header.offset_size() as u64);
        usize::try_from(total).unwrap_or(usize::MAX)
    }

    /// Parse an IFD from bytes starting at its entry count.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let byte_order = header.byte_order;
        let count_size = header.ifd_count_size();

        if bytes.len() < count_size {
            return Err(TiffError::FileTooSmall {
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = if header.is_bigtiff {
            byte_order.read_u64(bytes)
        } else {
            byte_order.read_u16(bytes) as u64
        };

        let required = Self::calculate_size(entry_count, header);
        if bytes.len() < required {
            return Err(TiffError::FileTooSmall {
                required: required as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_size = header.ifd_entry_size();
        let value_size = header.offset_size();
        let mut entries = Vec::with_capacity(entry_count as usize);

        for raw in bytes[count_size..]
            .chunks_exact(entry_size)
            .take(entry_count as usize)
        {
            let tag_id = byte_order.read_u16(raw);
            let field_type_raw = byte_order.read_u16(&raw[2..]);
            let (count, value_start) = if header.is_bigtiff {
                (byte_order.read_u64(&raw[4..]), 12)
            } else {
                (byte_order.read_u32(&raw[4..]) as u64, 8)
            };

            let field_type = FieldType::from_u16(field_type_raw);
            let is_inline = field_type
                .map(|ft| ft.fits_inline(count, header.is_bigtiff))
                .unwrap_or(false);

            entries.push(IfdEntry {
                tag_id,
                field_type,
                field_type_raw,
                count,
                value_offset_bytes: raw[value_start..value_start + value_size].to_vec(),
                is_inline,
            });
        }

        let next_start = count_size + entries.len() * entry_size;
        let next_ifd_offset = if header.is_bigtiff {
            byte_order.read_u64(&bytes[next_start..])
        } else {
            byte_order.read_u32(&bytes[next_start..]) as u64
        };

        Ok(Ifd {
            entries,
            next_ifd_offset,
        })
    }

    /// Look up an entry by tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        let id = tag.as_u16();
        self.entries.iter().find(|e| e.tag_id == id)
    }

    fn inline_u32(&self, tag: TiffTag, byte_order: ByteOrder) -> Option<u32> {
        self.get_entry_by_tag(tag)?.inline_u32(byte_order)
    }

    pub fn image_width(&self, byte_order: ByteOrder) -> Option<u32> {
        self.inline_u32(TiffTag::ImageWidth, byte_order)
    }

    pub fn image_height(&self, byte_order: ByteOrder) -> Option<u32> {
        self.inline_u32(TiffTag::ImageLength, byte_order)
    }

    pub fn tile_width(&self, byte_order: ByteOrder) -> Option<u32> {
        self.inline_u32(TiffTag::TileWidth, byte_order)
    }

    pub fn tile_height(&self, byte_order: ByteOrder) -> Option<u32> {
        self.inline_u32(TiffTag::TileLength, byte_order)
    }

    /// Raw Compression value; TIFF defaults to 1 (none) when absent.
    pub fn compression(&self, byte_order: ByteOrder) -> u16 {
        self.inline_u32(TiffTag::Compression, byte_order)
            .map(|c| c as u16)
            .unwrap_or(1)
    }

    pub fn samples_per_pixel(&self, byte_order: ByteOrder) -> u16 {
        self.inline_u32(TiffTag::SamplesPerPixel, byte_order)
            .map(|s| s as u16)
            .unwrap_or(1)
    }

    pub fn photometric(&self, byte_order: ByteOrder) -> Option<u16> {
        self.inline_u32(TiffTag::PhotometricInterpretation, byte_order)
            .map(|p| p as u16)
    }

    /// BitsPerSample when every sample has the same depth.
    ///
    /// TIFF defaults to 1 when absent. `None` means the depths differ or are
    /// stored out of line and still have to be read.
    pub fn bits_per_sample(&self, byte_order: ByteOrder) -> Option<u16> {
        let Some(entry) = self.get_entry_by_tag(TiffTag::BitsPerSample) else {
            return Some(1);
        };
        if !entry.is_inline || entry.field_type != Some(FieldType::Short) {
            return None;
        }
        uniform_depth(
            entry
                .value_offset_bytes
                .chunks_exact(2)
                .take(entry.count as usize)
                .map(|chunk| byte_order.read_u16(chunk) as u64),
        )
    }

    /// PlanarConfiguration; TIFF defaults to 1 (chunky) when absent.
    pub fn planar_configuration(&self, byte_order: ByteOrder) -> u16 {
        self.inline_u32(TiffTag::PlanarConfiguration, byte_order)
            .map(|p| p as u16)
            .unwrap_or(1)
    }

    /// ResolutionUnit; TIFF defaults to inches when absent.
    pub fn resolution_unit(&self, byte_order: ByteOrder) -> ResolutionUnit {
        self.inline_u32(TiffTag::ResolutionUnit, byte_order)
            .map(|u| ResolutionUnit::from_u16(u as u16))
            .unwrap_or(ResolutionUnit::Inch)
    }

    /// Rows per strip; TIFF defaults to the whole image when absent.
    pub fn rows_per_strip(&self, byte_order: ByteOrder) -> Option<u32> {
        self.inline_u32(TiffTag::RowsPerStrip, byte_order)
    }

    /// Whether the image data is organized in tiles.
    pub fn is_tiled(&self) -> bool {
        self.get_entry_by_tag(TiffTag::TileWidth).is_some()
            && self.get_entry_by_tag(TiffTag::TileLength).is_some()
            && self.get_entry_by_tag(TiffTag::TileOffsets).is_some()
    }

    /// Whether the image data is organized in strips.
    pub fn is_stripped(&self) -> bool {
        !self.is_tiled() && self.get_entry_by_tag(TiffTag::StripOffsets).is_some()
    }
}

/// The shared depth of a BitsPerSample array, `None` if empty or mixed.
pub fn uniform_depth(values: impl IntoIterator<Item = u64>) -> Option<u16> {
    let mut values = values.into_iter();
    let first = values.next()?;
    if values.all(|v| v == first) {
        u16::try_from(first).ok()
    } else {
        None
    }
}

// =============================================================================
// Tests
// =============================================================================
