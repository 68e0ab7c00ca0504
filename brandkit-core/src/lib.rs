//! # Brandkit Core
//!
//! Core logic for turning one SVG logo into a full set of brand assets.
//! Everything in this crate is pure and synchronous; rendering lives in
//! `brandkit-renderer`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               brandkit-core                 │
//! ├─────────────────────────────────────────────┤
//! │  SVG             │  Color                   │
//! │  - Canonicalize  │  - Palette extraction    │
//! │  - Dimensions    │  - Literal recolor       │
//! │                  │  - Luminance contrast    │
//! ├─────────────────────────────────────────────┤
//! │  Manifest        │  Project Store           │
//! │  - Web manifest  │  - Repository trait      │
//! │  - app.json      │  - JSON persistence      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod color;
pub mod error;
pub mod manifest;
pub mod project;
pub mod store;
pub mod svg;

pub use color::{contrast_color, extract_colors, parse_hex_color, recolor, ColorMap, Rgb, TextColor};
pub use error::{CoreError, CoreResult};
pub use manifest::{generate_app_json, generate_manifest, AppJson, WebManifest};
pub use project::{
    current_timestamp, DisplayMode, ExportSpec, ExtraAsset, LogoTransform, Orientation, Project,
    ProjectId, RasterResult,
};
pub use store::{ProjectRepository, ProjectStore, StoreError};
pub use svg::{get_svg_dimensions, normalize_svg, SvgDimensions, CANONICAL_SIZE};

/// Brandkit core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
