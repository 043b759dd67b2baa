//! Region compositing from a block grid.
//!
//! A region may straddle many tiles and may extend past the image edges.
//! Only the blocks that overlap the image part of the region are fetched and
//! decoded; everything outside the image stays transparent (`0`).

use tracing::trace;

use crate::error::SlideError;
use crate::format::tiff::{TileData, TileGrid};
use crate::io::RangeReader;

use super::decoder::{decode_block, BlockEncoding, DecodedTile};

/// Reads pixels from one tiled or stripped image.
pub struct GridReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    grid: &'a TileGrid,
    tiles: &'a TileData,
}

impl<'a, R: RangeReader + ?Sized> GridReader<'a, R> {
    pub fn new(reader: &'a R, grid: &'a TileGrid, tiles: &'a TileData) -> Self {
        Self {
            reader,
            grid,
            tiles,
        }
    }

    /// Fetch and decode the block at `(tile_x, tile_y)`.
    ///
    /// Returns `Ok(None)` for sparse blocks (zero byte count).
    pub fn read_tile(&self, tile_x: u32, tile_y: u32) -> Result<Option<DecodedTile>, SlideError> {
        let grid = self.grid;
        let index = grid
            .tile_index(tile_x, tile_y)
            .ok_or_else(|| SlideError::Decode {
                message: format!("tile ({}, {}) is outside the grid", tile_x, tile_y),
            })?;
        let (offset, length) = self
            .tiles
            .get_tile_location(index)
            .ok_or_else(|| SlideError::Decode {
                message: format!("no location recorded for tile {}", index),
            })?;
        if length == 0 {
            return Ok(None);
        }

        let length = usize::try_from(length).map_err(|_| SlideError::Decode {
            message: format!("tile {} is too large ({} bytes)", index, length),
        })?;
        let data = self.reader.read_exact_at(offset, length)?;

        // Tiles are stored padded to full size; the last strip is stored short
        let (width, height) = if grid.is_stripped {
            grid.tile_dimensions(tile_x, tile_y).unwrap_or((grid.tile_width, grid.tile_height))
        } else {
            (grid.tile_width, grid.tile_height)
        };

        let encoding = BlockEncoding {
            compression: grid.compression,
            samples_per_pixel: grid.samples_per_pixel,
            photometric: grid.photometric,
            jpeg_tables: self.tiles.jpeg_tables.as_deref(),
        };
        decode_block(&data, &encoding, width, height).map(Some)
    }

    /// Fill `dest` with the `width x height` region whose top-left corner is
    /// `(x, y)` in this image's pixel space.
    pub fn read_region(
        &self,
        dest: &mut [u32],
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    ) -> Result<(), SlideError> {
        let required = width as usize * height as usize;
        if dest.len() < required {
            return Err(SlideError::BufferTooSmall {
                required,
                actual: dest.len(),
            });
        }
        let dest = &mut dest[..required];
        dest.fill(0);

        let grid = self.grid;
        let x_start = x.max(0);
        let y_start = y.max(0);
        let x_end = x.saturating_add(width as i64).min(grid.width as i64);
        let y_end = y.saturating_add(height as i64).min(grid.height as i64);
        if x_start >= x_end || y_start >= y_end {
            return Ok(());
        }

        let tw = grid.tile_width as i64;
        let th = grid.tile_height as i64;
        let mut decoded = 0usize;

        for tile_y in (y_start / th)..=((y_end - 1) / th) {
            for tile_x in (x_start / tw)..=((x_end - 1) / tw) {
                let Some(tile) = self.read_tile(tile_x as u32, tile_y as u32)? else {
                    continue;
                };
                decoded += 1;

                let tile_x0 = tile_x * tw;
                let tile_y0 = tile_y * th;
                let col_start = x_start.max(tile_x0);
                let col_end = x_end.min(tile_x0 + tile.width as i64);
                let row_start = y_start.max(tile_y0);
                let row_end = y_end.min(tile_y0 + tile.height as i64);
                if col_start >= col_end {
                    continue;
                }
                let span = (col_end - col_start) as usize;

                for row in row_start..row_end {
                    let src = (row - tile_y0) as usize * tile.width as usize
                        + (col_start - tile_x0) as usize;
                    let dst = (row - y) as usize * width as usize + (col_start - x) as usize;
                    dest[dst..dst + span].copy_from_slice(&tile.pixels[src..src + span]);
                }
            }
        }

        trace!(
            ifd_index = grid.ifd_index,
            x,
            y,
            width,
            height,
            tiles = decoded,
            "composited region"
        );
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
