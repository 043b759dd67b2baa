//! Pixel layer.
//!
//! Turns stored tiles and strips into packed ARGB pixels:
//!
//! ```text
//! TileData (offsets, byte counts, JPEGTables)
//!        │  range reads
//!        ▼
//! decode_block  ── uncompressed / JPEG ──▶  DecodedTile (ARGB)
//!        │
//!        ▼
//! GridReader::read_region  ── crop + place ──▶  caller buffer
//! ```

mod decoder;
mod region;

pub use decoder::{decode_block, pack_argb, BlockEncoding, DecodedTile};
pub use region::GridReader;
