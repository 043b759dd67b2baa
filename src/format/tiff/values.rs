//! TIFF tag value reading.
//!
//! Values are either inline in the IFD entry or stored elsewhere in the file.
//! Arrays such as TileOffsets are fetched with a single range read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::FieldType;

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values respecting the file's byte order and layout.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes of an entry's value, inline or fetched from the file.
    pub fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        let size = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
            tag: "value",
            message: format!("value of {} bytes is not addressable", size),
        })?;

        if entry.is_inline {
            Ok(Bytes::copy_from_slice(&entry.value_offset_bytes[..size]))
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            Ok(self.reader.read_exact_at(offset, size)?)
        }
    }

    /// A single Short, Long or Long8 value.
    pub fn read_u64(&self, entry: &IfdEntry) -> Result<u64, TiffError> {
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }
        if entry.count != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: "scalar",
                message: format!("expected count 1, got {}", entry.count),
            });
        }
        let values = self.read_u64_array(entry)?;
        values.first().copied().ok_or(TiffError::InvalidTagValue {
            tag: "scalar",
            message: "empty value".to_string(),
        })
    }

    /// An array of Short, Long or Long8 values widened to u64.
    ///
    /// This is how TileOffsets, TileByteCounts and their strip counterparts
    /// are loaded.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let width = match field_type {
            FieldType::Short | FieldType::Long | FieldType::Long8 => field_type.size_in_bytes(),
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag: "array",
                    message: format!("expected Short, Long, or Long8, got {:?}", other),
                })
            }
        };

        let bytes = self.read_bytes(entry)?;
        let byte_order = self.header.byte_order;

        Ok(bytes
            .chunks_exact(width)
            .map(|chunk| match field_type {
                FieldType::Short => byte_order.read_u16(chunk) as u64,
                FieldType::Long => byte_order.read_u32(chunk) as u64,
                _ => byte_order.read_u64(chunk),
            })
            .collect())
    }

    /// An ASCII value with its NUL terminator removed.
    pub fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        if entry.field_type != Some(FieldType::Ascii) {
            return Err(TiffError::InvalidTagValue {
                tag: "string",
                message: format!("expected Ascii, got type {}", entry.field_type_raw),
            });
        }

        let bytes = self.read_bytes(entry)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// The first Rational of an entry as a float.
    ///
    /// A zero denominator yields an error instead of infinity.
    pub fn read_rational(&self, entry: &IfdEntry) -> Result<f64, TiffError> {
        if entry.field_type != Some(FieldType::Rational) || entry.count == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "rational",
                message: format!(
                    "expected Rational, got type {} with count {}",
                    entry.field_type_raw, entry.count
                ),
            });
        }

        let bytes = self.read_bytes(entry)?;
        let byte_order = self.header.byte_order;
        let numerator = byte_order.read_u32(&bytes);
        let denominator = byte_order.read_u32(&bytes[4..]);

        if denominator == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: "rational",
                message: "zero denominator".to_string(),
            });
        }
        Ok(numerator as f64 / denominator as f64)
    }
}

// =============================================================================
// Tests
// =============================================================================
