//! Command-line configuration for the slide tools.
//!
//! Two subcommands are available:
//!
//! - `dump`: print image information for every level and associated image,
//!   then write each one to an output directory
//! - `stream`: read one raster in horizontal bands, write it out and print
//!   its checksum
//!
//! # Environment Variables
//!
//! - `WSI_OUTPUT_DIR` - Directory for dumped images (default: current directory)
//! - `WSI_MAX_IMAGE_BYTES` - Largest raster the dump tool writes (default: 100 MiB)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// =============================================================================
// Default Values
// =============================================================================

/// Largest raster, in RGBA8 bytes, written by the dump tool.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 100 * 1024 * 1024;

/// Default output directory for dumped images.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Band heights are rounded up to a multiple of this under `approximateStreaming`.
pub const APPROXIMATE_STREAMING_ROWS: u64 = 64;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Whole-slide image tools.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-imageio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print slide information and write every level and associated image.
    Dump(DumpConfig),

    /// Read a raster in bands, write it and print its checksum.
    Stream(StreamConfig),
}

/// Output format of the dump report.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFormat {
    #[default]
    Text,
    Json,
}

// =============================================================================
// Dump
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct DumpConfig {
    /// Slide file to inspect.
    pub slide: PathBuf,

    /// Directory that receives `level{N}.tiff` and `{name}.tiff`.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "WSI_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Skip rasters larger than this many RGBA8 bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES, env = "WSI_MAX_IMAGE_BYTES")]
    pub max_bytes: u64,

    /// Report format.
    #[arg(long, value_enum, default_value_t = DumpFormat::Text)]
    pub format: DumpFormat,

    /// Only print the report.
    #[arg(long, default_value_t = false)]
    pub no_write: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl DumpConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.slide.as_os_str().is_empty() {
            return Err("A slide path is required".to_string());
        }
        if self.max_bytes == 0 {
            return Err("max_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Stream
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct StreamConfig {
    /// Slide file to read.
    pub input: PathBuf,

    /// Output image; the format follows the extension (png, jpg, tif).
    pub output: PathBuf,

    /// Directives: shouldFail, compress, approximateStreaming, level=N,
    /// associatedImage=NAME, downsample=F, stream=N.
    pub directives: Vec<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl StreamConfig {
    /// Validate paths and parse the directives.
    pub fn validate(&self) -> Result<StreamDirectives, String> {
        if self.input.as_os_str().is_empty() || self.output.as_os_str().is_empty() {
            return Err("Both an input and an output path are required".to_string());
        }
        StreamDirectives::parse(&self.directives)
    }
}

/// Which raster the stream tool reads.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSelection {
    Level(usize),
    AssociatedImage(String),
    Downsample(f64),
}

/// Parsed `stream` directives.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDirectives {
    /// Succeed only if some step fails
    pub should_fail: bool,

    /// Use the output format's stronger compression
    pub compress: bool,

    /// Round band heights up to [`APPROXIMATE_STREAMING_ROWS`]
    pub approximate_streaming: bool,

    /// Raster to read; level 0 when absent. The last selection directive wins.
    pub selection: Option<StreamSelection>,

    /// Number of horizontal bands
    pub divisions: u64,
}

impl Default for StreamDirectives {
    fn default() -> Self {
        Self {
            should_fail: false,
            compress: false,
            approximate_streaming: false,
            selection: None,
            divisions: 1,
        }
    }
}

impl StreamDirectives {
    /// Parse `key` and `key=value` directives. Unknown keys are an error.
    pub fn parse<S: AsRef<str>>(directives: &[S]) -> Result<Self, String> {
        let mut parsed = StreamDirectives::default();

        for directive in directives {
            let directive = directive.as_ref();
            let (key, value) = match directive.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (directive, None),
            };

            match (key, value) {
                ("shouldFail", None) => parsed.should_fail = true,
                ("compress", None) => parsed.compress = true,
                ("approximateStreaming", None) => parsed.approximate_streaming = true,
                ("level", Some(value)) => {
                    let level = value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid level: '{}'", value))?;
                    parsed.selection = Some(StreamSelection::Level(level));
                }
                ("associatedImage", Some(value)) if !value.is_empty() => {
                    parsed.selection = Some(StreamSelection::AssociatedImage(value.to_string()));
                }
                ("downsample", Some(value)) => {
                    let factor = value
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f > 0.0)
                        .ok_or_else(|| format!("Invalid downsample: '{}'", value))?;
                    parsed.selection = Some(StreamSelection::Downsample(factor));
                }
                ("stream", Some(value)) => {
                    parsed.divisions = value
                        .parse::<u64>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| format!("Invalid stream division count: '{}'", value))?;
                }
                _ => return Err(format!("Unknown directive: '{}'", directive)),
            }
        }

        Ok(parsed)
    }

    /// Rows per band for a raster of `height` rows.
    pub fn band_height(&self, height: u64) -> u64 {
        let mut rows = height.div_ceil(self.divisions.max(1));
        if self.approximate_streaming {
            rows = rows.div_ceil(APPROXIMATE_STREAMING_ROWS) * APPROXIMATE_STREAMING_ROWS;
        }
        rows.max(1)
    }
}

// =============================================================================
// Tests
// =============================================================================
