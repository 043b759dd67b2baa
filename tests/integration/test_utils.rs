//! Test utilities for integration tests.
//!
//! Provides:
//! - A TIFF writer for building SVS-like and generic pyramidal files
//! - Deterministic pixel patterns so levels can be compared with each other
//! - JPEG helpers for compressed tiles
//! - An in-memory slide with failure injection, and a source that opens it

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use wsi_imageio::slide::{
    insert_level_properties, to_level_coordinate, LevelInfo, SlideProperties, SlideReader,
    SlideSource, PROPERTY_BOUNDS_X, PROPERTY_BOUNDS_Y, PROPERTY_MPP_X, PROPERTY_MPP_Y,
    PROPERTY_VENDOR,
};
use wsi_imageio::{IoError, SlideError};

// =============================================================================
// Pixel patterns
// =============================================================================

/// RGB value of the level-0 pattern at `(x, y)`.
///
/// Every level of a fixture samples this pattern at `(i * ds, j * ds)`, so a
/// level read equals a strided level-0 read.
pub fn pattern(x: u32, y: u32) -> [u8; 3] {
    [
        (x / 4) as u8,
        (y / 4) as u8,
        ((x / 16 + y / 16) * 37) as u8,
    ]
}

/// Pattern as the backend's packed ARGB.
pub fn pattern_argb(x: u32, y: u32) -> u32 {
    let [r, g, b] = pattern(x, y);
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Pattern as the adapter's RGBA8 bytes.
pub fn pattern_rgba(x: u32, y: u32) -> [u8; 4] {
    let [r, g, b] = pattern(x, y);
    [r, g, b, 0xFF]
}

/// Uniform color of an associated image.
pub fn associated_color(name: &str) -> [u8; 3] {
    match name {
        "thumbnail" => [10, 120, 230],
        "label" => [250, 250, 20],
        "macro" => [90, 30, 60],
        _ => [0, 0, 0],
    }
}

/// SHA-256 of RGBA8 bytes, hex encoded.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// =============================================================================
// JPEG helpers
// =============================================================================

/// Create a solid-color RGB JPEG.
pub fn create_test_jpeg(width: u32, height: u32, color: [u8; 3], quality: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&img)
        .expect("Failed to encode test JPEG");
    buf
}

/// Split a complete JPEG into a tables-only stream and an abbreviated stream.
///
/// DQT and DHT segments move to the tables stream (`SOI ... EOI`); the rest
/// stays in the abbreviated stream, the layout SVS writers use.
pub fn split_jpeg_tables(jpeg: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut tables = vec![0xFF, 0xD8];
    let mut abbreviated = vec![0xFF, 0xD8];

    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        let marker = jpeg[pos + 1];
        if marker == 0xDA {
            abbreviated.extend_from_slice(&jpeg[pos..]);
            break;
        }
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let segment = &jpeg[pos..pos + 2 + len];
        if marker == 0xDB || marker == 0xC4 {
            tables.extend_from_slice(segment);
        } else {
            abbreviated.extend_from_slice(segment);
        }
        pos += 2 + len;
    }

    tables.extend_from_slice(&[0xFF, 0xD9]);
    (tables, abbreviated)
}

// =============================================================================
// TIFF writer
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// A tag value; its field type follows from the variant.
#[derive(Clone, Debug)]
pub enum TagValue {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Long8(Vec<u64>),
    Ascii(String),
    Rational(Vec<(u32, u32)>),
    Undefined(Vec<u8>),
}

impl TagValue {
    fn field_type(&self) -> u16 {
        match self {
            TagValue::Short(_) => 3,
            TagValue::Long(_) => 4,
            TagValue::Long8(_) => 16,
            TagValue::Ascii(_) => 2,
            TagValue::Rational(_) => 5,
            TagValue::Undefined(_) => 7,
        }
    }

    fn count(&self) -> u64 {
        match self {
            TagValue::Short(v) => v.len() as u64,
            TagValue::Long(v) => v.len() as u64,
            TagValue::Long8(v) => v.len() as u64,
            TagValue::Ascii(s) => s.len() as u64 + 1,
            TagValue::Rational(v) => v.len() as u64,
            TagValue::Undefined(v) => v.len() as u64,
        }
    }

    fn encode(&self, order: ByteOrderType) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            TagValue::Short(v) => v.iter().for_each(|x| write_uint(&mut out, order, *x as u64, 2)),
            TagValue::Long(v) => v.iter().for_each(|x| write_uint(&mut out, order, *x as u64, 4)),
            TagValue::Long8(v) => v.iter().for_each(|x| write_uint(&mut out, order, *x, 8)),
            TagValue::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            TagValue::Rational(v) => v.iter().for_each(|(n, d)| {
                write_uint(&mut out, order, *n as u64, 4);
                write_uint(&mut out, order, *d as u64, 4);
            }),
            TagValue::Undefined(v) => out.extend_from_slice(v),
        }
        out
    }
}

/// One image file directory: tags plus the pixel blocks it points to.
#[derive(Clone, Debug, Default)]
pub struct IfdBuilder {
    entries: BTreeMap<u16, TagValue>,
    blocks: Vec<Vec<u8>>,
    stripped: bool,
    bogus_block_offsets: bool,
}

impl IfdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tiled image; `blocks` are row-major tiles.
    pub fn tiled(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        compression: u16,
        blocks: Vec<Vec<u8>>,
    ) -> Self {
        let mut ifd = Self::new()
            .tag(256, TagValue::Long(vec![width]))
            .tag(257, TagValue::Long(vec![height]))
            .tag(258, TagValue::Short(vec![8, 8, 8]))
            .tag(259, TagValue::Short(vec![compression]))
            .tag(262, TagValue::Short(vec![2]))
            .tag(277, TagValue::Short(vec![3]))
            .tag(322, TagValue::Short(vec![tile_width as u16]))
            .tag(323, TagValue::Short(vec![tile_height as u16]));
        ifd.blocks = blocks;
        ifd
    }

    /// Stripped uncompressed RGB image; `blocks` are strips from the top.
    pub fn stripped(width: u32, height: u32, rows_per_strip: u32, blocks: Vec<Vec<u8>>) -> Self {
        let mut ifd = Self::new()
            .tag(254, TagValue::Long(vec![1]))
            .tag(256, TagValue::Long(vec![width]))
            .tag(257, TagValue::Long(vec![height]))
            .tag(258, TagValue::Short(vec![8, 8, 8]))
            .tag(259, TagValue::Short(vec![1]))
            .tag(262, TagValue::Short(vec![2]))
            .tag(277, TagValue::Short(vec![3]))
            .tag(278, TagValue::Long(vec![rows_per_strip]));
        ifd.blocks = blocks;
        ifd.stripped = true;
        ifd
    }

    pub fn tag(mut self, tag: u16, value: TagValue) -> Self {
        self.entries.insert(tag, value);
        self
    }

    pub fn description(self, text: &str) -> Self {
        self.tag(270, TagValue::Ascii(text.to_string()))
    }

    /// Point every block past the end of the file.
    pub fn with_bogus_block_offsets(mut self) -> Self {
        self.bogus_block_offsets = true;
        self
    }
}

/// Builder for TIFF files.
///
/// Layout: header, then every IFD's blocks and out-of-line values, then the
/// IFDs themselves chained in order.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    ifds: Vec<IfdBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            ifds: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Build the TIFF file data.
    pub fn build(self) -> Vec<u8> {
        let order = self.byte_order;
        let (header_size, inline_size, count_size) = if self.is_bigtiff {
            (16usize, 8usize, 8usize)
        } else {
            (8, 4, 2)
        };

        let mut data = match order {
            ByteOrderType::LittleEndian => b"II".to_vec(),
            ByteOrderType::BigEndian => b"MM".to_vec(),
        };
        if self.is_bigtiff {
            write_uint(&mut data, order, 43, 2);
            write_uint(&mut data, order, 8, 2);
            write_uint(&mut data, order, 0, 2);
            write_uint(&mut data, order, 0, 8);
        } else {
            write_uint(&mut data, order, 42, 2);
            write_uint(&mut data, order, 0, 4);
        }
        assert_eq!(data.len(), header_size);

        // Blocks and out-of-line values go first so every offset is known
        let mut tables: Vec<Vec<(u16, u16, u64, Vec<u8>)>> = Vec::new();
        for ifd in &self.ifds {
            let mut offsets = Vec::new();
            let mut counts = Vec::new();
            for block in &ifd.blocks {
                pad_even(&mut data);
                offsets.push(if ifd.bogus_block_offsets {
                    u32::MAX as u64 - 16
                } else {
                    data.len() as u64
                });
                counts.push(block.len() as u64);
                data.extend_from_slice(block);
            }

            let mut entries = ifd.entries.clone();
            if !ifd.blocks.is_empty() {
                let (offsets_tag, counts_tag) = if ifd.stripped { (273, 279) } else { (324, 325) };
                let as_value = |values: Vec<u64>| {
                    if self.is_bigtiff {
                        TagValue::Long8(values)
                    } else {
                        TagValue::Long(values.into_iter().map(|v| v as u32).collect())
                    }
                };
                entries.insert(offsets_tag, as_value(offsets));
                entries.insert(counts_tag, as_value(counts));
            }

            let mut table = Vec::new();
            for (tag, value) in entries {
                let mut bytes = value.encode(order);
                if bytes.len() > inline_size {
                    pad_even(&mut data);
                    let offset = data.len() as u64;
                    data.extend_from_slice(&bytes);
                    bytes = Vec::new();
                    write_uint(&mut bytes, order, offset, inline_size);
                } else {
                    bytes.resize(inline_size, 0);
                }
                table.push((tag, value.field_type(), value.count(), bytes));
            }
            tables.push(table);
        }

        pad_even(&mut data);
        let first_ifd = data.len() as u64;
        let pointer_at = if self.is_bigtiff { 8 } else { 4 };
        let mut pointer = Vec::new();
        write_uint(&mut pointer, order, first_ifd, inline_size);
        data[pointer_at..pointer_at + inline_size].copy_from_slice(&pointer);

        let ifd_count = tables.len();
        for (index, table) in tables.into_iter().enumerate() {
            write_uint(&mut data, order, table.len() as u64, count_size);
            for (tag, field_type, count, value) in table {
                write_uint(&mut data, order, tag as u64, 2);
                write_uint(&mut data, order, field_type as u64, 2);
                write_uint(&mut data, order, count, inline_size);
                data.extend_from_slice(&value);
            }
            let next = if index + 1 < ifd_count {
                data.len() as u64 + inline_size as u64
            } else {
                0
            };
            write_uint(&mut data, order, next, inline_size);
        }

        data
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_uint(data: &mut Vec<u8>, order: ByteOrderType, value: u64, size: usize) {
    let bytes = match order {
        ByteOrderType::LittleEndian => value.to_le_bytes(),
        ByteOrderType::BigEndian => value.to_be_bytes(),
    };
    match order {
        ByteOrderType::LittleEndian => data.extend_from_slice(&bytes[..size]),
        ByteOrderType::BigEndian => data.extend_from_slice(&bytes[8 - size..]),
    }
}

fn pad_even(data: &mut Vec<u8>) {
    if data.len() % 2 == 1 {
        data.push(0);
    }
}

// =============================================================================
// Slide fixtures
// =============================================================================

/// Level sizes of the fixture pyramid.
pub const LEVELS: [(u32, u32); 3] = [(512, 384), (256, 192), (128, 96)];

/// Tile edge of every fixture level.
pub const TILE: u32 = 64;

pub const THUMBNAIL_SIZE: (u32, u32) = (64, 48);
pub const LABEL_SIZE: (u32, u32) = (32, 24);

pub const SVS_DESCRIPTION: &str = "Aperio Image Library v12.0.15\r\n\
    512x384 (64x64) RAW|AppMag = 20|MPP = 0.5|ScanScope ID = SS1234|Date = 10/17/26";

/// Variants of the fixture slide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fixture {
    /// Aperio description, uncompressed tiles, thumbnail and label
    Svs,
    /// Like `Svs`, but level 0 tiles are JPEG with shared tables
    SvsJpeg,
    /// Like `Svs`, but every level-0 tile offset is past end of file
    SvsBrokenTiles,
    /// Like `Svs`, written big-endian BigTIFF
    SvsBigTiff,
    /// No vendor description, resolution in pixels per centimeter
    GenericTiff,
}

fn downsample_of(level: usize) -> u32 {
    LEVELS[0].0 / LEVELS[level].0
}

/// Uncompressed RGB tiles of a level, padded to full tile size.
fn raw_level_tiles(level: usize) -> Vec<Vec<u8>> {
    let (width, height) = LEVELS[level];
    let ds = downsample_of(level);
    let mut tiles = Vec::new();
    for ty in 0..height.div_ceil(TILE) {
        for tx in 0..width.div_ceil(TILE) {
            let mut tile = Vec::with_capacity((TILE * TILE * 3) as usize);
            for row in 0..TILE {
                for col in 0..TILE {
                    let x = tx * TILE + col;
                    let y = ty * TILE + row;
                    if x < width && y < height {
                        tile.extend_from_slice(&pattern(x * ds, y * ds));
                    } else {
                        tile.extend_from_slice(&[0, 0, 0]);
                    }
                }
            }
            tiles.push(tile);
        }
    }
    tiles
}

/// Uniform color JPEG tiles for level 0, plus their shared tables.
fn jpeg_level_tiles() -> (Vec<u8>, Vec<Vec<u8>>) {
    let (width, height) = LEVELS[0];
    let full = create_test_jpeg(TILE, TILE, JPEG_TILE_COLOR, 95);
    let (tables, abbreviated) = split_jpeg_tables(&full);
    let count = (width.div_ceil(TILE) * height.div_ceil(TILE)) as usize;
    (tables, vec![abbreviated; count])
}

/// Color of every JPEG tile in [`Fixture::SvsJpeg`].
pub const JPEG_TILE_COLOR: [u8; 3] = [200, 40, 40];

fn solid_strips(width: u32, height: u32, rows: u32, color: [u8; 3]) -> Vec<Vec<u8>> {
    (0..height.div_ceil(rows))
        .map(|strip| {
            let strip_rows = rows.min(height - strip * rows);
            color.repeat((width * strip_rows) as usize)
        })
        .collect()
}

/// The pyramid level `level` of `fixture`.
pub fn level_ifd(level: usize, fixture: Fixture) -> IfdBuilder {
    let (width, height) = LEVELS[level];
    match (level, fixture) {
        (0, Fixture::SvsJpeg) => {
            let (tables, tiles) = jpeg_level_tiles();
            IfdBuilder::tiled(width, height, TILE, TILE, 7, tiles)
                .tag(347, TagValue::Undefined(tables))
                .tag(262, TagValue::Short(vec![6]))
        }
        (0, Fixture::SvsBrokenTiles) => {
            IfdBuilder::tiled(width, height, TILE, TILE, 1, raw_level_tiles(0))
                .with_bogus_block_offsets()
        }
        _ => IfdBuilder::tiled(width, height, TILE, TILE, 1, raw_level_tiles(level)),
    }
}

/// Encode a fixture slide.
pub fn build_slide(fixture: Fixture) -> Vec<u8> {
    let builder = match fixture {
        Fixture::SvsBigTiff => TiffBuilder::new()
            .with_bigtiff(true)
            .with_byte_order(ByteOrderType::BigEndian),
        _ => TiffBuilder::new(),
    };

    if fixture == Fixture::GenericTiff {
        let base = level_ifd(0, fixture)
            .tag(282, TagValue::Rational(vec![(20000, 1)]))
            .tag(283, TagValue::Rational(vec![(40000, 2)]))
            .tag(296, TagValue::Short(vec![3]))
            .tag(305, TagValue::Ascii("pyramid writer 1.0".to_string()));
        let (tw, th) = THUMBNAIL_SIZE;
        return builder
            .add_ifd(base)
            .add_ifd(level_ifd(1, fixture))
            .add_ifd(level_ifd(2, fixture))
            .add_ifd(IfdBuilder::stripped(tw, th, th, solid_strips(tw, th, th, [1, 2, 3])))
            .build();
    }

    let (tw, th) = THUMBNAIL_SIZE;
    let (lw, lh) = LABEL_SIZE;
    builder
        .add_ifd(
            level_ifd(0, fixture)
                .description(SVS_DESCRIPTION)
                .tag(271, TagValue::Ascii("Aperio".to_string())),
        )
        .add_ifd(
            IfdBuilder::stripped(tw, th, 16, solid_strips(tw, th, 16, associated_color("thumbnail")))
                .description("Aperio Image Library v12.0.15\r\n512x384 -> 64x48 - "),
        )
        .add_ifd(level_ifd(1, fixture).description("Aperio Image Library v12.0.15 256x192"))
        .add_ifd(level_ifd(2, fixture).description("Aperio Image Library v12.0.15 128x96"))
        .add_ifd(
            IfdBuilder::stripped(lw, lh, lh, solid_strips(lw, lh, lh, associated_color("label")))
                .description("Aperio Image Library v12.0.15\r\nlabel 32x24"),
        )
        .build()
}

/// A fixture slide written to a temporary directory.
pub struct SlideFile {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl SlideFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `fixture` to `<tmp>/<file_name>`.
pub fn write_slide(fixture: Fixture, file_name: &str) -> SlideFile {
    write_bytes(&build_slide(fixture), file_name)
}

/// Write raw bytes to `<tmp>/<file_name>`.
pub fn write_bytes(bytes: &[u8], file_name: &str) -> SlideFile {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(file_name);
    let mut file = std::fs::File::create(&path).expect("Failed to create slide file");
    file.write_all(bytes).expect("Failed to write slide file");
    SlideFile { dir, path }
}

// =============================================================================
// Synthetic slide
// =============================================================================

/// In-memory slide whose levels sample [`pattern`].
///
/// Counts backend calls and can be told to fail pixel reads.
#[derive(Clone)]
pub struct SyntheticSlide {
    levels: Vec<LevelInfo>,
    associated_names: Vec<String>,
    properties: SlideProperties,
    fail_reads: bool,
    reads: Arc<AtomicUsize>,
}

impl SyntheticSlide {
    /// Levels with the given downsamples over a `width x height` base.
    pub fn new(width: u32, height: u32, downsamples: &[u32]) -> Self {
        let levels: Vec<LevelInfo> = downsamples
            .iter()
            .map(|&ds| LevelInfo {
                width: width / ds,
                height: height / ds,
                downsample: ds as f64,
                tile_width: 256,
                tile_height: 256,
            })
            .collect();

        let mut properties = SlideProperties::new();
        properties.insert(PROPERTY_VENDOR.to_string(), "synthetic".to_string());
        insert_level_properties(&mut properties, &levels);

        Self {
            levels,
            associated_names: vec!["thumbnail".to_string()],
            properties,
            fail_reads: false,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_resolution(mut self, mpp_x: f64, mpp_y: f64) -> Self {
        self.properties.insert(PROPERTY_MPP_X.to_string(), mpp_x.to_string());
        self.properties.insert(PROPERTY_MPP_Y.to_string(), mpp_y.to_string());
        self
    }

    pub fn with_bounds(mut self, x: i64, y: i64) -> Self {
        self.properties.insert(PROPERTY_BOUNDS_X.to_string(), x.to_string());
        self.properties.insert(PROPERTY_BOUNDS_Y.to_string(), y.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Shared counter of pixel reads reaching this slide.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl SlideReader for SyntheticSlide {
    fn vendor(&self) -> &str {
        "synthetic"
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|l| (l.width, l.height))
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.levels.get(level).map(|l| l.downsample)
    }

    fn level_tile_size(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|l| (l.tile_width, l.tile_height))
    }

    fn associated_image_names(&self) -> &[String] {
        &self.associated_names
    }

    fn associated_image_dimensions(&self, name: &str) -> Option<(u32, u32)> {
        (name == "thumbnail").then_some(THUMBNAIL_SIZE)
    }

    fn properties(&self) -> &SlideProperties {
        &self.properties
    }

    fn read_region(
        &self,
        dest: &mut [u32],
        x0: i64,
        y0: i64,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<(), SlideError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(SlideError::Decode {
                message: "injected read failure".to_string(),
            });
        }

        let info = self.levels.get(level).ok_or(SlideError::LevelOutOfRange {
            level,
            count: self.levels.len(),
        })?;
        let ds = info.downsample;
        let x = to_level_coordinate(x0, ds);
        let y = to_level_coordinate(y0, ds);

        for row in 0..height as i64 {
            for col in 0..width as i64 {
                let (lx, ly) = (x + col, y + row);
                let inside =
                    lx >= 0 && ly >= 0 && lx < info.width as i64 && ly < info.height as i64;
                dest[(row * width as i64 + col) as usize] = if inside {
                    pattern_argb((lx as f64 * ds) as u32, (ly as f64 * ds) as u32)
                } else {
                    0
                };
            }
        }
        Ok(())
    }

    fn read_associated_image(&self, name: &str, dest: &mut [u32]) -> Result<(), SlideError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let (width, height) = self
            .associated_image_dimensions(name)
            .ok_or_else(|| SlideError::UnknownAssociatedImage(name.to_string()))?;
        let [r, g, b] = associated_color(name);
        let argb = 0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32;
        dest[..(width * height) as usize].fill(argb);
        Ok(())
    }
}

/// Opens a clone of one [`SyntheticSlide`] for any path without "missing".
pub struct SyntheticSource {
    pub slide: SyntheticSlide,
    pub opens: Arc<AtomicUsize>,
}

impl SyntheticSource {
    pub fn new(slide: SyntheticSlide) -> Self {
        Self {
            slide,
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SlideSource for SyntheticSource {
    fn open(&self, path: &Path) -> Result<Box<dyn SlideReader>, SlideError> {
        if path.to_string_lossy().contains("missing") {
            return Err(IoError::NotFound(path.display().to_string()).into());
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.slide.clone()))
    }
}
