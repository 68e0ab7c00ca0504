//! Input validation for untrusted data.
//!
//! All user-supplied input MUST be validated before use.
//! This module provides validators for the request payloads the API accepts.

use std::collections::BTreeSet;

use brandkit_core::{ColorMap, CoreError, ExportSpec, ProjectId};
use thiserror::Error;

/// Maximum length for project names.
pub const MAX_NAME_LEN: usize = 256;
/// Maximum length for descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 2048;
/// Maximum logo markup size.
pub const MAX_SVG_LEN: usize = 2_097_152; // 2MB
/// Maximum length for a color token.
pub const MAX_COLOR_LEN: usize = 64;
/// Largest icon edge accepted for export.
pub const MAX_ICON_SIZE: u32 = 4096;
/// Maximum number of icon sizes per export.
pub const MAX_SIZES: usize = 32;
/// Maximum number of color substitutions per request.
pub const MAX_COLOR_ENTRIES: usize = 256;

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Project name is empty or whitespace.
    #[error("name is required")]
    NameEmpty,
    /// Project name exceeds maximum length.
    #[error("name too long (max {MAX_NAME_LEN} chars)")]
    NameTooLong,
    /// Project name contains a path separator or control character.
    #[error("name contains invalid characters")]
    NameInvalidChars,
    /// Description exceeds maximum length.
    #[error("description too long (max {MAX_DESCRIPTION_LEN} chars)")]
    DescriptionTooLong,
    /// Logo markup is missing.
    #[error("svgContent is required")]
    SvgEmpty,
    /// Logo markup exceeds maximum size.
    #[error("svgContent too large (max {MAX_SVG_LEN} bytes)")]
    SvgTooLarge,
    /// Logo markup has no `<svg` element.
    #[error("svgContent does not contain an <svg> element")]
    SvgNotSvg,
    /// Color token exceeds maximum length.
    #[error("color too long (max {MAX_COLOR_LEN} chars)")]
    ColorTooLong,
    /// Color token contains markup characters.
    #[error("color contains invalid characters: {0}")]
    ColorInvalidChars(String),
    /// Icon size out of range.
    #[error("icon size {0} out of range (1-{MAX_ICON_SIZE})")]
    SizeOutOfRange(u32),
    /// Too many icon sizes requested.
    #[error("too many sizes (max {MAX_SIZES})")]
    TooManySizes,
    /// Too many color substitutions.
    #[error("too many colors (max {MAX_COLOR_ENTRIES})")]
    TooManyColors,
    /// Path parameter is not a project ID.
    #[error("invalid project id: {0}")]
    ProjectIdInvalid(String),
    /// Body could not be parsed.
    #[error("invalid request body: {0}")]
    Body(String),
    /// The resulting project violates a record invariant.
    #[error("invalid project: {0}")]
    Project(#[from] CoreError),
}

impl ValidationError {
    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NameEmpty | Self::NameTooLong | Self::NameInvalidChars => "name",
            Self::DescriptionTooLong => "description",
            Self::SvgEmpty | Self::SvgTooLarge | Self::SvgNotSvg => "svg",
            Self::ColorTooLong | Self::ColorInvalidChars(_) | Self::TooManyColors => "color",
            Self::SizeOutOfRange(_) | Self::TooManySizes => "size",
            Self::ProjectIdInvalid(_) => "project_id",
            Self::Body(_) => "body",
            Self::Project(_) => "project",
        }
    }
}

/// Validate a project name.
///
/// # Errors
///
/// Returns [`ValidationError::NameEmpty`] for blank names and
/// [`ValidationError::NameTooLong`] past [`MAX_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

/// Validate the name of a stored project.
///
/// Project names become archive file names, so path separators and control
/// characters are rejected on top of [`validate_name`].
///
/// # Errors
///
/// Returns [`ValidationError::NameInvalidChars`] or any [`validate_name`] error.
pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    validate_name(name)?;
    if name
        .chars()
        .any(|c| matches!(c, '/' | '\\') || c.is_control())
    {
        return Err(ValidationError::NameInvalidChars);
    }
    Ok(())
}

/// Validate an optional description.
///
/// # Errors
///
/// Returns [`ValidationError::DescriptionTooLong`] past [`MAX_DESCRIPTION_LEN`].
pub fn validate_description(description: Option<&str>) -> Result<(), ValidationError> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => {
            Err(ValidationError::DescriptionTooLong)
        }
        _ => Ok(()),
    }
}

/// Validate logo markup for import.
///
/// # Errors
///
/// Returns [`ValidationError::SvgEmpty`], [`ValidationError::SvgTooLarge`] or
/// [`ValidationError::SvgNotSvg`].
pub fn validate_svg(svg: &str) -> Result<(), ValidationError> {
    if svg.trim().is_empty() {
        return Err(ValidationError::SvgEmpty);
    }
    validate_svg_size(svg)?;
    if !svg.contains("<svg") {
        return Err(ValidationError::SvgNotSvg);
    }
    Ok(())
}

/// Size check only; the social endpoint renders text-only cards for
/// missing or broken logos.
///
/// # Errors
///
/// Returns [`ValidationError::SvgTooLarge`] past [`MAX_SVG_LEN`] bytes.
pub fn validate_svg_size(svg: &str) -> Result<(), ValidationError> {
    if svg.len() > MAX_SVG_LEN {
        return Err(ValidationError::SvgTooLarge);
    }
    Ok(())
}

/// Validate a color token that will be written into markup.
///
/// # Errors
///
/// Returns [`ValidationError::ColorTooLong`] or
/// [`ValidationError::ColorInvalidChars`] for quotes and angle brackets.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    if color.len() > MAX_COLOR_LEN {
        return Err(ValidationError::ColorTooLong);
    }
    if color.chars().any(|c| matches!(c, '"' | '\'' | '<' | '>' | '&')) {
        return Err(ValidationError::ColorInvalidChars(color.to_string()));
    }
    Ok(())
}

/// Validate an optional color field.
///
/// # Errors
///
/// See [`validate_color`].
pub fn validate_optional_color(color: Option<&str>) -> Result<(), ValidationError> {
    color.map_or(Ok(()), validate_color)
}

/// Validate a substitution map.
///
/// # Errors
///
/// Returns [`ValidationError::TooManyColors`] or the first invalid token.
pub fn validate_color_map(colors: &ColorMap) -> Result<(), ValidationError> {
    if colors.len() > MAX_COLOR_ENTRIES {
        return Err(ValidationError::TooManyColors);
    }
    for (original, replacement) in colors.iter() {
        validate_color(original)?;
        validate_color(replacement)?;
    }
    Ok(())
}

/// Validate requested icon sizes.
///
/// # Errors
///
/// Returns [`ValidationError::TooManySizes`] or
/// [`ValidationError::SizeOutOfRange`].
pub fn validate_sizes(sizes: &BTreeSet<u32>) -> Result<(), ValidationError> {
    if sizes.len() > MAX_SIZES {
        return Err(ValidationError::TooManySizes);
    }
    if let Some(&bad) = sizes.iter().find(|&&s| s == 0 || s > MAX_ICON_SIZE) {
        return Err(ValidationError::SizeOutOfRange(bad));
    }
    Ok(())
}

/// Validate the archive selection for an export.
///
/// # Errors
///
/// Returns [`ValidationError::Project`] for a zero size, otherwise any
/// [`validate_sizes`] error.
pub fn validate_export_spec(spec: &ExportSpec) -> Result<(), ValidationError> {
    spec.validate()?;
    validate_sizes(&spec.sizes)
}

/// Parse a project ID path parameter.
///
/// # Errors
///
/// Returns [`ValidationError::ProjectIdInvalid`] for anything but a UUID.
pub fn parse_project_id(id: &str) -> Result<ProjectId, ValidationError> {
    ProjectId::parse(id).map_err(|_| ValidationError::ProjectIdInvalid(id.to_string()))
}
