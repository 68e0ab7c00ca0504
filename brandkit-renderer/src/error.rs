//! Renderer error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// One tier's failure inside a social render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    /// Tier name.
    pub tier: &'static str,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier, self.reason)
    }
}

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// SVG markup could not be parsed.
    #[error("SVG parsing failed: {0}")]
    Svg(String),

    /// Rasterization failed.
    #[error("Rasterization failed: {0}")]
    Raster(String),

    /// Image encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// The font file could not be read.
    #[error("Failed to load font {}: {source}", path.display())]
    Font {
        /// Configured font path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A layout could not be composed.
    #[error("Layout failed: {0}")]
    Layout(String),

    /// Every social render tier failed.
    #[error("All render tiers failed: {}", join_failures(.0))]
    TiersExhausted(Vec<TierFailure>),

    /// Building the archive failed.
    #[error("Packaging failed: {0}")]
    Package(String),

    /// I/O error while writing an artifact.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_failures(failures: &[TierFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
