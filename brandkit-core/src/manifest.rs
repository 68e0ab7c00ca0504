//! Descriptor generation: the PWA web manifest and the Expo `app.json`.
//!
//! Both generators are pure functions of a [`Project`] and the selected icon
//! sizes. They never touch rendering, so the documents can be produced (and
//! tested) without rasterizing anything.

use serde::Serialize;

use crate::project::{Orientation, Project};

/// Fallback for every color field a project leaves unset.
const DEFAULT_COLOR: &str = "#ffffff";

/// Sizes whose icons are declared maskable.
const MASKABLE_SIZES: [u32; 2] = [512, 1024];

/// A W3C web app manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebManifest {
    /// Application name.
    pub name: String,
    /// Short name for launchers.
    pub short_name: String,
    /// Description.
    pub description: String,
    /// Browser UI theme color.
    pub theme_color: String,
    /// Splash background color.
    pub background_color: String,
    /// Display mode keyword.
    pub display: String,
    /// Orientation keyword.
    pub orientation: String,
    /// Start URL.
    pub start_url: String,
    /// One entry per exported icon.
    pub icons: Vec<ManifestIcon>,
    /// Placeholder splash screenshot.
    pub screenshots: Vec<ManifestScreenshot>,
    /// Store categories (always empty).
    pub categories: Vec<String>,
}

/// An icon entry in the web manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestIcon {
    /// File name inside the archive.
    pub src: String,
    /// `{n}x{n}`.
    pub sizes: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// `any` or `any maskable`.
    pub purpose: String,
}

/// A screenshot entry in the web manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestScreenshot {
    /// File name inside the archive.
    pub src: String,
    /// `{w}x{h}`.
    pub sizes: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Form factor hint.
    pub form_factor: String,
}

/// Build the web manifest for `project` with one icon per entry in `sizes`.
#[must_use]
pub fn generate_manifest(project: &Project, sizes: &[u32]) -> WebManifest {
    WebManifest {
        name: project.name.clone(),
        short_name: project
            .short_name
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| project.name.clone()),
        description: project.description.clone().unwrap_or_default(),
        theme_color: color_or_default(project.theme_color.as_deref()),
        background_color: color_or_default(project.app_background_color.as_deref()),
        display: project.display_mode.unwrap_or_default().as_str().to_string(),
        orientation: project.orientation.unwrap_or_default().as_str().to_string(),
        start_url: project
            .start_url
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/".to_string()),
        icons: sizes.iter().map(|&size| manifest_icon(size)).collect(),
        screenshots: vec![ManifestScreenshot {
            src: "splash.png".to_string(),
            sizes: "1080x1920".to_string(),
            mime_type: "image/png".to_string(),
            form_factor: "wide".to_string(),
        }],
        categories: Vec::new(),
    }
}

fn manifest_icon(size: u32) -> ManifestIcon {
    let purpose = if MASKABLE_SIZES.contains(&size) {
        "any maskable"
    } else {
        "any"
    };
    ManifestIcon {
        src: icon_file_name(size),
        sizes: format!("{size}x{size}"),
        mime_type: "image/png".to_string(),
        purpose: purpose.to_string(),
    }
}

fn color_or_default(color: Option<&str>) -> String {
    color
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COLOR)
        .to_string()
}

/// Archive file name of the icon for `size`.
#[must_use]
pub fn icon_file_name(size: u32) -> String {
    format!("icon-{size}.png")
}

/// Root of an Expo `app.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppJson {
    /// Expo configuration.
    pub expo: ExpoConfig,
}

/// The `expo` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoConfig {
    /// Application name.
    pub name: String,
    /// URL-safe slug.
    pub slug: String,
    /// App version.
    pub version: String,
    /// `default`, `portrait`, `landscape`, ...
    pub orientation: String,
    /// App icon path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Light/dark preference.
    pub user_interface_style: String,
    /// Splash screen.
    pub splash: ExpoSplash,
    /// iOS settings.
    pub ios: ExpoIos,
    /// Android settings.
    pub android: ExpoAndroid,
    /// Web settings.
    pub web: ExpoWeb,
    /// Description.
    pub description: String,
}

/// Splash screen settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoSplash {
    /// Splash image path.
    pub image: String,
    /// How the image is fitted.
    pub resize_mode: String,
    /// Fill behind the image.
    pub background_color: String,
}

/// iOS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoIos {
    /// iPad support.
    pub supports_tablet: bool,
    /// Bundle identifier.
    pub bundle_identifier: String,
}

/// Android settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoAndroid {
    /// Adaptive launcher icon.
    pub adaptive_icon: ExpoAdaptiveIcon,
    /// Application package.
    pub package: String,
}

/// Android adaptive icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpoAdaptiveIcon {
    /// Foreground layer path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_image: Option<String>,
    /// Background layer color.
    pub background_color: String,
}

/// Web settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpoWeb {
    /// Favicon path.
    pub favicon: String,
}

/// Lowercase `name` and turn each whitespace run into a single hyphen.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
        } else {
            slug.extend(c.to_lowercase());
            in_whitespace = false;
        }
    }
    slug
}

/// Build the Expo `app.json` for `project`.
///
/// The main icon prefers the 512 asset and the Android foreground prefers the
/// 192 asset; both fall back to the largest selected size and are omitted
/// when nothing was selected.
#[must_use]
pub fn generate_app_json(project: &Project, sizes: &[u32]) -> AppJson {
    let largest = sizes.iter().copied().max();
    let preferred = |wanted: u32| {
        if sizes.contains(&wanted) {
            Some(wanted)
        } else {
            largest
        }
    };
    let asset_path = |size: u32| format!("./{}", icon_file_name(size));

    let slug_source = project
        .short_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&project.name);
    let slug = slugify(slug_source);
    let bundle_id = format!("com.example.{}", slug.replace('-', ""));
    let app_background = color_or_default(project.app_background_color.as_deref());

    let orientation = match project.orientation.unwrap_or_default() {
        Orientation::Any => "default",
        other => other.as_str(),
    };

    AppJson {
        expo: ExpoConfig {
            name: project.name.clone(),
            slug,
            version: "1.0.0".to_string(),
            orientation: orientation.to_string(),
            icon: preferred(512).map(asset_path),
            user_interface_style: "light".to_string(),
            splash: ExpoSplash {
                image: "./splash.png".to_string(),
                resize_mode: "contain".to_string(),
                background_color: app_background.clone(),
            },
            ios: ExpoIos {
                supports_tablet: true,
                bundle_identifier: bundle_id.clone(),
            },
            android: ExpoAndroid {
                adaptive_icon: ExpoAdaptiveIcon {
                    foreground_image: preferred(192).map(asset_path),
                    background_color: app_background,
                },
                package: bundle_id,
            },
            web: ExpoWeb {
                favicon: "./favicon.ico".to_string(),
            },
            description: project.description.clone().unwrap_or_default(),
        },
    }
}

/// Serialize a descriptor as two-space indented JSON.
///
/// # Errors
///
/// Returns the serializer error; the descriptor types here never produce one.
pub fn to_pretty_json<T: Serialize>(document: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(document)
}
