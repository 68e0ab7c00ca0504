//! Project records and the transient export types derived from them.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::{recolor, ColorMap};
use crate::error::{CoreError, CoreResult};
use crate::svg::{normalize_svg, CANONICAL_SIZE};

/// Largest corner radius in canonical units (half of the 512 artboard).
pub const MAX_BORDER_RADIUS: f32 = CANONICAL_SIZE / 2.0;

/// Icon sizes offered when an export does not name any.
pub const DEFAULT_SIZES: [u32; 7] = [16, 32, 64, 128, 192, 512, 1024];

/// Current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Unique identifier for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Create a new unique project ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a project ID from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns the UUID parse error if `s` is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PWA display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Standalone app window.
    #[default]
    Standalone,
    /// Full screen, no browser UI.
    Fullscreen,
    /// Minimal browser UI.
    MinimalUi,
    /// Regular browser tab.
    Browser,
}

impl DisplayMode {
    /// The manifest keyword for this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Fullscreen => "fullscreen",
            Self::MinimalUi => "minimal-ui",
            Self::Browser => "browser",
        }
    }
}

/// Preferred screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// No preference.
    #[default]
    Any,
    /// The device's natural orientation.
    Natural,
    /// Landscape only.
    Landscape,
    /// Portrait only.
    Portrait,
}

impl Orientation {
    /// The manifest keyword for this orientation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Natural => "natural",
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
        }
    }
}

/// Optional assets bundled next to the icon set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraAsset {
    /// `favicon.ico` at 32x32.
    Favicon,
    /// `splash.png` at 1080x1920.
    Splash,
    /// `manifest.json`.
    Manifest,
    /// `app.json`.
    AppJson,
    /// `opengraph-image.svg`.
    OpenGraph,
}

fn default_scale() -> f32 {
    1.0
}

/// A brand project: one logo plus the metadata needed to export it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier.
    #[serde(default)]
    pub id: ProjectId,
    /// Display name, also used for file naming.
    pub name: String,
    /// Logo markup (canonical once imported).
    pub svg_content: String,

    /// Zoom factor applied at raster time.
    #[serde(default = "default_scale")]
    pub logo_scale: f32,
    /// Horizontal pan in canonical units.
    #[serde(default)]
    pub logo_x: f32,
    /// Vertical pan in canonical units.
    #[serde(default)]
    pub logo_y: f32,
    /// Export canvas background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Corner radius in canonical units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f32>,

    /// Manifest short name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Manifest description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Manifest theme color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    /// Manifest/splash background color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_background_color: Option<String>,
    /// Manifest display mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<DisplayMode>,
    /// Manifest orientation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    /// Manifest start URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,

    /// Last icon sizes chosen for export.
    #[serde(default)]
    pub selected_sizes: Vec<u32>,
    /// Last extra assets chosen for export.
    #[serde(default)]
    pub selected_extra_assets: Vec<ExtraAsset>,

    /// Creation time (Unix ms).
    #[serde(default)]
    pub created_at: u64,
    /// Last update time (Unix ms).
    #[serde(default)]
    pub updated_at: u64,
}

impl Project {
    /// Create a project from a freshly uploaded logo.
    ///
    /// The logo is canonicalized into the 512x512 artboard on import.
    #[must_use]
    pub fn new(name: impl Into<String>, raw_svg: &str) -> Self {
        let now = current_timestamp();
        Self {
            id: ProjectId::new(),
            name: name.into(),
            svg_content: normalize_svg(raw_svg),
            logo_scale: 1.0,
            logo_x: 0.0,
            logo_y: 0.0,
            background_color: None,
            border_radius: None,
            short_name: None,
            description: None,
            theme_color: None,
            app_background_color: None,
            display_mode: None,
            orientation: None,
            start_url: None,
            selected_sizes: Vec::new(),
            selected_extra_assets: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the logo with a newly uploaded one.
    pub fn replace_logo(&mut self, raw_svg: &str) {
        self.svg_content = normalize_svg(raw_svg);
        self.touch();
    }

    /// Persist an edit session's color substitutions into the logo markup.
    pub fn apply_colors(&mut self, colors: &ColorMap) {
        if colors.is_empty() {
            return;
        }
        self.svg_content = recolor(&self.svg_content, colors);
        self.touch();
    }

    /// Update the pan/zoom transform.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidScale`] if `scale` is not a positive finite
    /// number, or [`CoreError::InvalidOffset`] for non-finite offsets.
    pub fn set_transform(&mut self, scale: f32, x: f32, y: f32) -> CoreResult<()> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CoreError::InvalidScale(scale));
        }
        if !(x.is_finite() && y.is_finite()) {
            return Err(CoreError::InvalidOffset(x, y));
        }
        self.logo_scale = scale;
        self.logo_x = x;
        self.logo_y = y;
        self.touch();
        Ok(())
    }

    /// The raster-time transform for this project.
    #[must_use]
    pub fn transform(&self) -> LogoTransform {
        LogoTransform {
            scale: self.logo_scale,
            x: self.logo_x,
            y: self.logo_y,
            background_color: self.background_color.clone(),
            border_radius: self.border_radius.unwrap_or(0.0),
        }
    }

    /// Check the record invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::EmptyName);
        }
        if !(self.logo_scale.is_finite() && self.logo_scale > 0.0) {
            return Err(CoreError::InvalidScale(self.logo_scale));
        }
        if !(self.logo_x.is_finite() && self.logo_y.is_finite()) {
            return Err(CoreError::InvalidOffset(self.logo_x, self.logo_y));
        }
        if let Some(radius) = self.border_radius {
            if !(0.0..=MAX_BORDER_RADIUS).contains(&radius) {
                return Err(CoreError::InvalidBorderRadius(radius));
            }
        }
        Ok(())
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = current_timestamp();
    }
}

/// User-controlled placement applied when rasterizing the logo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoTransform {
    /// Dimensionless zoom factor.
    pub scale: f32,
    /// Horizontal pan in canonical units.
    pub x: f32,
    /// Vertical pan in canonical units.
    pub y: f32,
    /// Canvas background fill.
    pub background_color: Option<String>,
    /// Corner radius in canonical units.
    pub border_radius: f32,
}

impl Default for LogoTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            x: 0.0,
            y: 0.0,
            background_color: None,
            border_radius: 0.0,
        }
    }
}

/// What to put in an export archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpec {
    /// Square icon sizes in pixels.
    #[serde(default = "default_size_set")]
    pub sizes: BTreeSet<u32>,
    /// Optional assets to include.
    #[serde(default)]
    pub extra_assets: BTreeSet<ExtraAsset>,
}

fn default_size_set() -> BTreeSet<u32> {
    DEFAULT_SIZES.into_iter().collect()
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self {
            sizes: default_size_set(),
            extra_assets: [
                ExtraAsset::Favicon,
                ExtraAsset::Splash,
                ExtraAsset::Manifest,
                ExtraAsset::AppJson,
                ExtraAsset::OpenGraph,
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl ExportSpec {
    /// Build a spec from the preferences saved on a project, falling back
    /// to the defaults for anything the project never chose.
    #[must_use]
    pub fn from_project(project: &Project) -> Self {
        let defaults = Self::default();
        Self {
            sizes: if project.selected_sizes.is_empty() {
                defaults.sizes
            } else {
                project.selected_sizes.iter().copied().collect()
            },
            extra_assets: if project.selected_extra_assets.is_empty() {
                defaults.extra_assets
            } else {
                project.selected_extra_assets.iter().copied().collect()
            },
        }
    }

    /// Sizes in ascending order.
    #[must_use]
    pub fn sorted_sizes(&self) -> Vec<u32> {
        self.sizes.iter().copied().collect()
    }

    /// Whether an extra asset was requested.
    #[must_use]
    pub fn wants(&self, asset: ExtraAsset) -> bool {
        self.extra_assets.contains(&asset)
    }

    /// Check that every size is positive.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ZeroSize`] if the set contains `0`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.sizes.contains(&0) {
            return Err(CoreError::ZeroSize);
        }
        Ok(())
    }
}

/// Outcome of rasterizing one size; `bytes` is `None` when that size failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterResult {
    /// Edge length in pixels.
    pub size: u32,
    /// Encoded PNG, if rasterization succeeded.
    pub bytes: Option<Vec<u8>>,
}

impl RasterResult {
    /// A successful raster.
    #[must_use]
    pub fn ok(size: u32, bytes: Vec<u8>) -> Self {
        Self {
            size,
            bytes: Some(bytes),
        }
    }

    /// A tolerated failure.
    #[must_use]
    pub fn failed(size: u32) -> Self {
        Self { size, bytes: None }
    }

    /// Whether this size produced output.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.bytes.is_some()
    }
}
