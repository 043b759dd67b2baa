//! Region adapter integration tests.
//!
//! Tests verify:
//! - Every level and associated image reports usable geometry
//! - Selection changes and downsample-based level choice
//! - Streamed band reads reproduce a whole-raster read
//! - Output pixels are RGBA8
//! - Oversized requests are rejected before reaching the backend
//! - A failed read closes the slide until information is read again

use std::path::Path;
use std::sync::atomic::Ordering;

use wsi_imageio::slide::BackendSession;
use wsi_imageio::{
    rgba_bytes, AdapterState, ImageIo, ImageIoError, RegionRequest, Selection, SlideImageIo,
};

use super::test_utils::{
    associated_color, checksum, pattern_rgba, write_slide, Fixture, SyntheticSlide,
    SyntheticSource, LEVELS, THUMBNAIL_SIZE,
};

fn opened(path: &Path) -> SlideImageIo {
    let mut io = SlideImageIo::new();
    io.set_file_name(path);
    io.read_image_information().expect("slide should open");
    io
}

/// Read the whole selected raster as RGBA8 bytes.
fn read_all<I: ImageIo>(io: &mut I) -> Vec<u8> {
    let descriptor = io.descriptor().expect("information was read");
    let request = RegionRequest::whole(descriptor.width, descriptor.height);
    let mut pixels = vec![0u32; request.pixel_count().unwrap()];
    io.read_region(&mut pixels, &request).unwrap();
    rgba_bytes(&pixels)
}

// =============================================================================
// Image information
// =============================================================================

#[test]
fn test_every_level_has_geometry() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());
    assert_eq!(io.level_count(), 3);

    for level in 0..io.level_count() as usize {
        io.set_level(level);
        io.read_image_information().unwrap();

        let descriptor = io.descriptor().unwrap();
        let ds = (1 << level) as f64;
        assert_eq!(
            (descriptor.width, descriptor.height),
            (LEVELS[level].0 as u64, LEVELS[level].1 as u64)
        );
        assert!(descriptor.width > 0 && descriptor.height > 0);
        assert_eq!((descriptor.spacing_x, descriptor.spacing_y), (0.5 * ds, 0.5 * ds));
        assert_eq!((descriptor.origin_x, descriptor.origin_y), (0.0, 0.0));
        assert_eq!(io.level_downsample(), Some(ds));
        assert_eq!(io.state(), AdapterState::Opened);
    }

    assert_eq!(io.metadata()["wsi.vendor"], "aperio");
    assert_eq!(io.metadata()["aperio.MPP"], "0.5");
    assert_eq!(io.vendor().as_deref(), Some("aperio"));
}

#[test]
fn test_generic_tiff_geometry() {
    let file = write_slide(Fixture::GenericTiff, "slide.tiff");
    let mut io = opened(file.path());
    io.set_level(2);
    io.read_image_information().unwrap();

    assert_eq!(io.dimensions(), Some((128, 96)));
    assert_eq!(io.spacing(), Some((2.0, 2.0)));
    assert!(io.associated_image_names().is_empty());
    assert_eq!(io.image_size_in_bytes(), Some(128 * 96 * 4));
}

#[test]
fn test_origin_and_default_spacing() {
    let slide = SyntheticSlide::new(2048, 1024, &[1, 2, 8]).with_bounds(300, 150);
    let mut io = SlideImageIo::with_session(BackendSession::with_source(SyntheticSource::new(slide)));
    io.set_file_name(Path::new("bounded.svs"));
    io.set_level(2);
    io.read_image_information().unwrap();

    assert_eq!(io.dimensions(), Some((256, 128)));
    assert_eq!(io.origin(), Some((300.0, 150.0)));
    // No resolution in the slide
    assert_eq!(io.spacing(), Some((1.0, 1.0)));
}

#[test]
fn test_spacing_follows_level_downsample() {
    let slide = SyntheticSlide::new(4096, 2048, &[1, 4, 16]).with_resolution(0.25, 0.5);
    let mut io = SlideImageIo::with_session(BackendSession::with_source(SyntheticSource::new(slide)));
    io.set_file_name(Path::new("anisotropic.svs"));
    io.read_image_information().unwrap();
    assert_eq!(io.spacing(), Some((0.25, 0.5)));

    assert_eq!(io.set_level_for_downsample(4.0).unwrap(), 1);
    io.read_image_information().unwrap();
    assert_eq!(io.dimensions(), Some((1024, 512)));
    assert_eq!(io.spacing(), Some((1.0, 2.0)));

    io.set_level(2);
    io.read_image_information().unwrap();
    assert_eq!(io.spacing(), Some((4.0, 8.0)));

    io.set_associated_image("thumbnail");
    io.read_image_information().unwrap();
    assert_eq!(io.spacing(), Some((1.0, 1.0)));
}

#[test]
fn test_associated_image_information() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());
    assert_eq!(io.associated_image_names(), vec!["thumbnail", "label"]);

    io.set_associated_image("thumbnail");
    io.read_image_information().unwrap();
    assert!(!io.can_stream_read());
    assert_eq!(
        io.dimensions(),
        Some((THUMBNAIL_SIZE.0 as u64, THUMBNAIL_SIZE.1 as u64))
    );
    assert_eq!(io.spacing(), Some((1.0, 1.0)));
    assert_eq!(io.origin(), Some((0.0, 0.0)));
    assert_eq!(io.level_downsample(), None);

    let bytes = read_all(&mut io);
    let [r, g, b] = associated_color("thumbnail");
    assert!(bytes.chunks_exact(4).all(|p| p == [r, g, b, 0xFF]));
}

#[test]
fn test_associated_read_ignores_requested_rectangle() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());
    io.set_associated_image("label");
    io.read_image_information().unwrap();

    let (width, height) = io.dimensions().unwrap();
    let mut pixels = vec![0u32; (width * height) as usize];
    io.read_region(&mut pixels, &RegionRequest::new(5, 5, 2, 2)).unwrap();

    let [r, g, b] = associated_color("label");
    assert!(rgba_bytes(&pixels)
        .chunks_exact(4)
        .all(|p| p == [r, g, b, 0xFF]));

    // The whole image must fit even when a smaller rectangle is requested
    let mut small = vec![0u32; 4];
    assert!(matches!(
        io.read_region(&mut small, &RegionRequest::new(0, 0, 2, 2)),
        Err(ImageIoError::BufferTooSmall { .. })
    ));
}

#[test]
fn test_unknown_associated_image() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());

    io.set_associated_image("macro");
    assert!(matches!(
        io.read_image_information(),
        Err(ImageIoError::DimensionsUnavailable { .. })
    ));
    assert_eq!(io.state(), AdapterState::Invalidated);
    assert_eq!(io.descriptor(), None);

    io.set_level(0);
    io.read_image_information().unwrap();
    assert_eq!(io.state(), AdapterState::Opened);
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_set_level_for_downsample() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());

    assert_eq!(io.set_level_for_downsample(3.9).unwrap(), 2);
    assert_eq!(io.selection(), &Selection::Level(2));
    // Idempotent
    assert_eq!(io.set_level_for_downsample(3.9).unwrap(), 2);

    // Geometry follows on the next information read
    assert_eq!(io.dimensions(), Some((512, 384)));
    io.read_image_information().unwrap();
    assert_eq!(io.dimensions(), Some((128, 96)));

    assert_eq!(io.set_level_for_downsample(1.2).unwrap(), 0);
    assert!(matches!(
        io.set_level_for_downsample(-2.0),
        Err(ImageIoError::UnknownSelection { .. })
    ));
    assert_eq!(io.level(), Some(0));
}

#[test]
fn test_downsample_replaces_associated_selection() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());

    io.set_associated_image("label");
    assert_eq!(io.set_level_for_downsample(2.0).unwrap(), 1);
    assert_eq!(io.associated_image_name(), None);
    assert_eq!(io.level(), Some(1));
}

// =============================================================================
// Pixel reads
// =============================================================================

#[test]
fn test_output_is_rgba() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());
    io.set_level(1);
    io.read_image_information().unwrap();

    let mut pixels = vec![0u32; 3 * 2];
    io.read_region(&mut pixels, &RegionRequest::new(20, 30, 3, 2)).unwrap();
    let bytes = rgba_bytes(&pixels);

    assert_eq!(bytes[..4], pattern_rgba(40, 60));
    assert_eq!(bytes[8..12], pattern_rgba(44, 60));
    assert_eq!(bytes[20..24], pattern_rgba(44, 62));
}

#[test]
fn test_streamed_bands_match_whole_read() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());
    io.set_level(1);
    io.read_image_information().unwrap();
    let whole = read_all(&mut io);

    let (width, height) = io.dimensions().unwrap();
    let band = 50;
    let mut streamed = Vec::new();
    let mut y = 0;
    while y < height {
        let requested = RegionRequest::new(0, y as i64, width, band.min(height - y));
        let request = io.generate_streamable_read_region(&requested);
        let mut pixels = vec![0u32; request.pixel_count().unwrap()];
        io.read_region(&mut pixels, &request).unwrap();
        streamed.extend(rgba_bytes(&pixels));
        y += request.height;
    }

    assert_eq!(checksum(&streamed), checksum(&whole));
}

#[test]
fn test_level_checksum_matches_downsampled_base() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());
    let base = read_all(&mut io);
    let (w0, _) = LEVELS[0];

    io.set_level(2);
    io.read_image_information().unwrap();
    let level = read_all(&mut io);
    let (w, h) = LEVELS[2];
    let ds = (w0 / w) as usize;

    let mut strided = Vec::with_capacity(level.len());
    for j in 0..h as usize {
        for i in 0..w as usize {
            let offset = (j * ds * w0 as usize + i * ds) * 4;
            strided.extend_from_slice(&base[offset..offset + 4]);
        }
    }
    assert_eq!(checksum(&level), checksum(&strided));
}

#[test]
fn test_buffer_too_small() {
    let file = write_slide(Fixture::Svs, "slide.svs");
    let mut io = opened(file.path());

    let mut pixels = vec![0u32; 15];
    assert!(matches!(
        io.read_region(&mut pixels, &RegionRequest::new(0, 0, 4, 4)),
        Err(ImageIoError::BufferTooSmall { required: 16, actual: 15 })
    ));
    // Not a backend failure
    assert_eq!(io.state(), AdapterState::Opened);
}

#[test]
fn test_overflow_rejected_before_backend() {
    let slide = SyntheticSlide::new(1024, 1024, &[1, 4]);
    let reads = slide.read_counter();
    let mut io = SlideImageIo::with_session(BackendSession::with_source(SyntheticSource::new(slide)));
    io.set_file_name(Path::new("synthetic.svs"));
    io.read_image_information().unwrap();

    let mut pixels = vec![0u32; 16];
    let request = RegionRequest::new(0, 0, 1 << 33, 1 << 33);
    assert!(matches!(
        io.read_region(&mut pixels, &request),
        Err(ImageIoError::OverflowRejected { .. })
    ));
    assert_eq!(reads.load(Ordering::SeqCst), 0);
    assert_eq!(io.state(), AdapterState::Opened);
    assert!(io.session().is_open());

    io.read_region(&mut pixels, &RegionRequest::new(0, 0, 4, 4)).unwrap();
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Failure and recovery
// =============================================================================

#[test]
fn test_failed_read_closes_slide() {
    let file = write_slide(Fixture::SvsBrokenTiles, "broken.svs");
    let mut io = opened(file.path());

    let mut pixels = vec![0u32; 16];
    let request = RegionRequest::new(0, 0, 4, 4);
    assert!(matches!(
        io.read_region(&mut pixels, &request),
        Err(ImageIoError::RegionReadFailed { .. })
    ));
    assert_eq!(io.state(), AdapterState::Invalidated);
    assert!(!io.session().is_open());
    assert_eq!(io.descriptor(), None);
    assert_eq!(io.level_count(), -1);

    // Every read fails until information is read again
    assert!(matches!(
        io.read_region(&mut pixels, &request),
        Err(ImageIoError::ResourceUnavailable { .. })
    ));

    io.set_level(1);
    io.read_image_information().unwrap();
    io.read_region(&mut pixels, &request).unwrap();
    assert_eq!(rgba_bytes(&pixels)[..4], pattern_rgba(0, 0));
}

#[test]
fn test_backend_failure_reason_is_reported() {
    let slide = SyntheticSlide::new(512, 512, &[1]).failing();
    let source = SyntheticSource::new(slide);
    let opens = source.opens.clone();
    let mut io = SlideImageIo::with_session(BackendSession::with_source(source));
    io.set_file_name(Path::new("flaky.svs"));
    io.read_image_information().unwrap();

    let mut pixels = vec![0u32; 4];
    match io.read_region(&mut pixels, &RegionRequest::new(0, 0, 2, 2)) {
        Err(ImageIoError::RegionReadFailed { path, reason }) => {
            assert_eq!(path, "flaky.svs");
            assert!(reason.contains("injected read failure"));
        }
        other => panic!("expected RegionReadFailed, got {:?}", other),
    }

    // Reading information reopens the slide
    io.read_image_information().unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 2);
    assert!(io.session().is_open());
}

#[test]
fn test_open_failure() {
    let mut io = SlideImageIo::with_session(BackendSession::with_source(SyntheticSource::new(
        SyntheticSlide::new(64, 64, &[1]),
    )));
    io.set_file_name(Path::new("missing.svs"));

    match io.read_image_information() {
        Err(ImageIoError::OpenFailed { path, reason }) => {
            assert_eq!(path, "missing.svs");
            assert!(reason.contains("missing.svs"));
        }
        other => panic!("expected OpenFailed, got {:?}", other),
    }
    assert_eq!(io.state(), AdapterState::Invalidated);
}
