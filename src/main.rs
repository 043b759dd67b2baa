//! Whole-slide image tools.
//!
//! `dump` prints everything the slide adapter reports and writes each raster
//! to disk; `stream` reads one raster in bands and prints its checksum.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_imageio::{
    config::{Cli, Command, DumpConfig, DumpFormat, StreamConfig, StreamDirectives, StreamSelection},
    imageio::{rgba_bytes, ImageIo, MetadataMap, RegionRequest, SlideImageIo},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Dump(config) => run_dump(config),
        Command::Stream(config) => run_stream(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_imageio=debug"
    } else {
        "wsi_imageio=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Read a whole raster of the current selection as RGBA8 bytes.
fn read_raster(io: &mut SlideImageIo) -> Result<(u32, u32, Vec<u8>), String> {
    let (width, height) = io
        .dimensions()
        .ok_or_else(|| "image information has not been read".to_string())?;
    let request = RegionRequest::whole(width, height);
    let mut pixels = vec![0u32; request.pixel_count().map_err(|e| e.to_string())?];
    io.read_region(&mut pixels, &request)
        .map_err(|e| e.to_string())?;
    Ok((to_u32(width)?, to_u32(height)?, rgba_bytes(&pixels)))
}

fn to_u32(value: u64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("dimension {} is too large to encode", value))
}

// =============================================================================
// Dump Command
// =============================================================================

#[derive(Debug, Serialize)]
struct LevelReport {
    level: usize,
    width: u64,
    height: u64,
    downsample: Option<f64>,
    spacing: (f64, f64),
    size_in_bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AssociatedReport {
    name: String,
    width: u64,
    height: u64,
    size_in_bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
struct DumpReport {
    file: String,
    vendor: Option<String>,
    width: u64,
    height: u64,
    component_type: String,
    pixel_type: String,
    metadata: MetadataMap,
    levels: Vec<LevelReport>,
    associated_images: Vec<AssociatedReport>,
}

fn run_dump(config: DumpConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut io = SlideImageIo::new();
    io.set_file_name(&config.slide);

    let report = match build_report(&mut io) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        DumpFormat::Text => print_report(&report),
        DumpFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    if !config.no_write {
        if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
            eprintln!(
                "Error: cannot create {}: {}",
                config.output_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
        write_rasters(&mut io, &report, &config);
    }

    ExitCode::SUCCESS
}

fn build_report(io: &mut SlideImageIo) -> Result<DumpReport, String> {
    io.read_image_information().map_err(|e| e.to_string())?;
    let (width, height) = io.dimensions().unwrap_or((0, 0));

    let mut report = DumpReport {
        file: io
            .file_name()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        vendor: io.vendor(),
        width,
        height,
        component_type: io.component_type().to_string(),
        pixel_type: io.pixel_type().to_string(),
        metadata: io.metadata().clone(),
        levels: Vec::new(),
        associated_images: Vec::new(),
    };

    let level_count = usize::try_from(io.level_count()).unwrap_or(0);
    for level in 0..level_count {
        io.set_level(level);
        io.read_image_information().map_err(|e| e.to_string())?;
        let (width, height) = io.dimensions().unwrap_or((0, 0));
        report.levels.push(LevelReport {
            level,
            width,
            height,
            downsample: io.level_downsample(),
            spacing: io.spacing().unwrap_or((1.0, 1.0)),
            size_in_bytes: io.image_size_in_bytes(),
        });
    }

    for name in io.associated_image_names() {
        io.set_associated_image(name.clone());
        io.read_image_information().map_err(|e| e.to_string())?;
        let (width, height) = io.dimensions().unwrap_or((0, 0));
        report.associated_images.push(AssociatedReport {
            name,
            width,
            height,
            size_in_bytes: io.image_size_in_bytes(),
        });
    }

    Ok(report)
}

fn print_report(report: &DumpReport) {
    println!("File: {}", report.file);
    println!("Vendor: {}", report.vendor.as_deref().unwrap_or("unknown"));
    println!("Dimensions: {} x {}", report.width, report.height);
    println!("Component type: {}", report.component_type);
    println!("Pixel type: {}", report.pixel_type);
    println!();

    println!("Metadata:");
    for (key, value) in &report.metadata {
        println!("  {} = {}", key, value);
    }
    println!();

    println!("Levels:");
    for level in &report.levels {
        println!(
            "  [{}] {} x {}, downsample {}, spacing {} x {}, {} bytes",
            level.level,
            level.width,
            level.height,
            level.downsample.unwrap_or(1.0),
            level.spacing.0,
            level.spacing.1,
            level.size_in_bytes.unwrap_or(0)
        );
    }
    println!();

    println!("Associated images:");
    if report.associated_images.is_empty() {
        println!("  (none)");
    }
    for image in &report.associated_images {
        println!(
            "  {}: {} x {}, {} bytes",
            image.name,
            image.width,
            image.height,
            image.size_in_bytes.unwrap_or(0)
        );
    }
}

/// Write every raster that fits under the size ceiling. Failures are logged.
fn write_rasters(io: &mut SlideImageIo, report: &DumpReport, config: &DumpConfig) {
    let too_large = |size: Option<u64>| size.map_or(true, |s| s > config.max_bytes);

    for level in &report.levels {
        let path = config.output_dir.join(format!("level{}.tiff", level.level));
        if too_large(level.size_in_bytes) {
            warn!(
                level = level.level,
                bytes = ?level.size_in_bytes,
                limit = config.max_bytes,
                "skipping level above size limit"
            );
            continue;
        }
        io.set_level(level.level);
        if let Err(e) = write_selection(io, &path) {
            error!(level = level.level, path = %path.display(), error = %e, "failed to write level");
        }
    }

    for image in &report.associated_images {
        let path = config.output_dir.join(format!("{}.tiff", image.name));
        if too_large(image.size_in_bytes) {
            warn!(
                name = %image.name,
                bytes = ?image.size_in_bytes,
                limit = config.max_bytes,
                "skipping associated image above size limit"
            );
            continue;
        }
        io.set_associated_image(image.name.clone());
        if let Err(e) = write_selection(io, &path) {
            error!(name = %image.name, path = %path.display(), error = %e, "failed to write associated image");
        }
    }
}

fn write_selection(io: &mut SlideImageIo, path: &Path) -> Result<(), String> {
    io.read_image_information().map_err(|e| e.to_string())?;
    let (width, height, bytes) = read_raster(io)?;
    let image = RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| "pixel buffer does not match dimensions".to_string())?;
    image
        .save_with_format(path, ImageFormat::Tiff)
        .map_err(|e| e.to_string())?;
    info!(path = %path.display(), width, height, "wrote raster");
    Ok(())
}

// =============================================================================
// Stream Command
// =============================================================================

fn run_stream(config: StreamConfig) -> ExitCode {
    init_logging(config.verbose);

    let directives = match config.validate() {
        Ok(directives) => directives,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "Usage: wsi-imageio stream <input> <output> [shouldFail] [compress] \
                 [approximateStreaming] [level=N] [associatedImage=NAME] [downsample=F] [stream=N]"
            );
            return ExitCode::FAILURE;
        }
    };

    let result = stream(&config, &directives);
    let failed = match &result {
        Ok(checksum) => {
            println!("{}  {}", checksum, config.output.display());
            false
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            true
        }
    };

    if failed == directives.should_fail {
        ExitCode::SUCCESS
    } else {
        if directives.should_fail {
            eprintln!("Error: expected a failure, but every step succeeded");
        }
        ExitCode::FAILURE
    }
}

/// Read the selected raster in bands, write it and return its SHA-256.
fn stream(config: &StreamConfig, directives: &StreamDirectives) -> Result<String, String> {
    let mut io = SlideImageIo::new();
    io.set_file_name(&config.input);
    io.read_image_information().map_err(|e| e.to_string())?;

    match &directives.selection {
        None => {}
        Some(StreamSelection::Level(level)) => io.set_level(*level),
        Some(StreamSelection::AssociatedImage(name)) => io.set_associated_image(name.clone()),
        Some(StreamSelection::Downsample(factor)) => {
            let level = io
                .set_level_for_downsample(*factor)
                .map_err(|e| e.to_string())?;
            info!(downsample = factor, level, "selected level for downsample");
        }
    }
    io.read_image_information().map_err(|e| e.to_string())?;

    let (width, height) = io
        .dimensions()
        .ok_or_else(|| "image information has not been read".to_string())?;
    let total = RegionRequest::whole(width, height)
        .pixel_count()
        .map_err(|e| e.to_string())?;
    let mut pixels = vec![0u32; total];

    if io.can_stream_read() {
        let band = directives.band_height(height);
        let mut y = 0u64;
        while y < height {
            let rows = band.min(height - y);
            let requested = RegionRequest::new(0, y as i64, width, rows);
            let region = io.generate_streamable_read_region(&requested);
            let start = (y * width) as usize;
            debug!(y, rows, "reading band");
            io.read_region(&mut pixels[start..], &region)
                .map_err(|e| e.to_string())?;
            y += rows;
        }
    } else {
        io.read_region(&mut pixels, &RegionRequest::whole(width, height))
            .map_err(|e| e.to_string())?;
    }

    let bytes = rgba_bytes(&pixels);
    let checksum = hex::encode(Sha256::digest(&bytes));

    let image = RgbaImage::from_raw(to_u32(width)?, to_u32(height)?, bytes)
        .ok_or_else(|| "pixel buffer does not match dimensions".to_string())?;
    write_output(&config.output, image, directives.compress)?;

    Ok(checksum)
}

/// Encode `image` by the output extension.
fn write_output(path: &Path, image: RgbaImage, compress: bool) -> Result<(), String> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let (width, height) = image.dimensions();

    let create = || {
        File::create(path)
            .map(BufWriter::new)
            .map_err(|e| format!("cannot create {}: {}", path.display(), e))
    };

    match extension.as_str() {
        "png" => {
            let compression = if compress {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            PngEncoder::new_with_quality(create()?, compression, FilterType::Adaptive)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| e.to_string())
        }
        "jpg" | "jpeg" => {
            let quality = if compress { 75 } else { 90 };
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            JpegEncoder::new_with_quality(create()?, quality)
                .encode_image(&rgb)
                .map_err(|e| e.to_string())
        }
        "tif" | "tiff" => {
            if compress {
                warn!("compression is not supported for TIFF output; writing uncompressed");
            }
            image
                .save_with_format(path, ImageFormat::Tiff)
                .map_err(|e| e.to_string())
        }
        _ => Err(format!(
            "unsupported output format: '{}'",
            path.display()
        )),
    }
}
