//! Error types for core operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when validating or mutating a project.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Project name is empty or whitespace.
    #[error("Project name must not be empty")]
    EmptyName,

    /// Logo scale is zero, negative, or not finite.
    #[error("Invalid logo scale: {0} (must be > 0)")]
    InvalidScale(f32),

    /// Corner radius outside the canonical 0..=256 range.
    #[error("Invalid border radius: {0} (must be within 0..=256)")]
    InvalidBorderRadius(f32),

    /// Pan offset is not a finite number.
    #[error("Invalid logo offset: ({0}, {1})")]
    InvalidOffset(f32, f32),

    /// An export size of zero was requested.
    #[error("Export sizes must be positive integers")]
    ZeroSize,
}
