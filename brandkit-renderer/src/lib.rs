//! # Brandkit Renderer
//!
//! Turns canonical logos into raster icons, social preview cards and
//! downloadable asset archives.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              ExportPipeline                 │
//! ├──────────────┬──────────────┬───────────────┤
//! │ Rasterizer   │ Social cards │ Packager      │
//! │ resvg + skia │ tier chain   │ zip           │
//! │ (per size)   │ (sequential) │ (fatal)       │
//! └──────────────┴──────────────┴───────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod font;
pub mod package;
pub mod raster;
pub mod social;

pub use error::{RenderError, RenderResult, TierFailure};
pub use export::{ExportArtifact, ExportPipeline, FAVICON_SIZE, SPLASH_TARGET};
pub use font::FontAsset;
pub use package::{archive_file_name, ArchiveSink, AssetBundle, DirectorySink, Packager, ZipPackager};
pub use raster::{rasterize_sizes, rasterize_target, IconRasterizer, RasterTarget, ResvgRasterizer};
pub use social::{
    compute_style, default_tiers, FullLayout, LogoOnly, PreviewRenderer, RenderTier, SocialImage,
    SocialImageRenderer, SocialMeta, SocialStyle, TextOnly, TierContext, OG_HEIGHT, OG_WIDTH,
};
