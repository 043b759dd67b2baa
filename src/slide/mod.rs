//! Slide abstraction layer.
//!
//! This module provides a unified interface for working with Whole Slide Images
//! regardless of their underlying format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             SlideImageIo                │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            BackendSession               │
//! │  (one open slide, level-0 scaling)      │
//! └────────────────────┬────────────────────┘
//!                      │  SlideSource::open
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           SlideReader Trait             │
//! │  (format-agnostic slide interface)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │   SvsReader     │    │ GenericTiffReader   │
//! │  (SVS format)   │    │ (standard TIFF)     │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use wsi_imageio::slide::{BackendSession, Selection};
//!
//! let mut session = BackendSession::new();
//! if session.open("slide.svs") {
//!     let level = Selection::Level(1);
//!     let (width, height) = session.dimensions(&level).unwrap_or((0, 0));
//!     let mut pixels = vec![0u32; (width * height) as usize];
//!     if let Some(err) = session.read_region(&mut pixels, 0, 0, width, height, &level) {
//!         eprintln!("read failed: {}", err);
//!     }
//! }
//! ```

mod reader;
mod session;
mod source;

pub use reader::{
    insert_level_properties, level_property, to_level_coordinate, LevelInfo, SlideProperties,
    SlideReader, PROPERTY_BOUNDS_X, PROPERTY_BOUNDS_Y, PROPERTY_LEVEL_COUNT, PROPERTY_MPP_X,
    PROPERTY_MPP_Y, PROPERTY_OBJECTIVE_POWER, PROPERTY_VENDOR,
};
pub use session::{BackendSession, Selection};
pub use source::{open_slide, LocalSlideSource, SlideSource};
