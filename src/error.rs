use thiserror::Error;

/// I/O errors that can occur when reading slide bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error reported by the operating system
    #[error("I/O error: {0}")]
    Os(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        IoError::Os(err.to_string())
    }
}

/// Errors related to format detection and validation
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// TIFF parsing error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File format is not supported
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0} (only uncompressed and JPEG are supported)")]
    UnsupportedCompression(String),

    /// Samples the decoder cannot expand to 8-bit RGB
    #[error("Unsupported sample layout: {0} (only 8-bit interleaved samples are supported)")]
    UnsupportedSampleLayout(String),

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors reported by a whole-slide backend while decoding pixels.
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// The slide structure could not be read
    #[error("{0}")]
    Tiff(#[from] TiffError),

    /// The slide could not be opened as a supported format
    #[error("{0}")]
    Format(#[from] FormatError),

    /// Level index outside `[0, level_count)`
    #[error("Level {level} out of range (slide has {count} levels)")]
    LevelOutOfRange { level: usize, count: usize },

    /// No associated image with this name
    #[error("Unknown associated image: '{0}'")]
    UnknownAssociatedImage(String),

    /// Destination buffer cannot hold the requested pixels
    #[error("Destination buffer too small: need {required} pixels, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    /// Compressed tile or strip data could not be decoded
    #[error("Failed to decode image data: {message}")]
    Decode { message: String },
}

impl From<IoError> for SlideError {
    fn from(err: IoError) -> Self {
        SlideError::Tiff(TiffError::Io(err))
    }
}

/// Errors surfaced by the region adapter to its callers.
///
/// Every variant carries enough context (file, reason) to be logged as-is.
#[derive(Debug, Clone, Error)]
pub enum ImageIoError {
    /// No slide is open, or the previous handle was invalidated by a failure
    #[error("No open slide for '{path}'; call read_image_information() first")]
    ResourceUnavailable { path: String },

    /// The backend refused to open the file
    #[error("Failed to open '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    /// The backend could not report geometry for the current selection
    #[error("Could not read dimensions of {selection} in '{path}'")]
    DimensionsUnavailable { path: String, selection: String },

    /// The backend reported an error while fetching pixels
    #[error("Failed to read region from '{path}': {reason}")]
    RegionReadFailed { path: String, reason: String },

    /// The requested pixel count does not fit in `usize`
    #[error("Region of {width}x{height} pixels exceeds the addressable pixel count")]
    OverflowRejected { width: u64, height: u64 },

    /// No level matches the requested downsample factor
    #[error("No level available for downsample factor {downsample}")]
    UnknownSelection { downsample: f64 },

    /// The caller's buffer is smaller than the requested region
    #[error("Buffer too small: need {required} pixels, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    /// No file name was set before reading
    #[error("No file name set")]
    NoFileName,
}
