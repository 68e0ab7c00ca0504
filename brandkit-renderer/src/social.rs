//! Social preview ("Open Graph") images.
//!
//! A 1200x630 card is composed as SVG from the project's name, description,
//! background and logo. The server variant walks an ordered list of
//! [`RenderTier`]s and returns the first one that succeeds; the preview
//! variant runs a single layout and falls back to the bare logo.

use std::fmt::Write;

use base64::Engine;
use brandkit_core::{contrast_color, TextColor};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult, TierFailure};
use crate::font::FontAsset;

/// Card width in pixels.
pub const OG_WIDTH: u32 = 1200;
/// Card height in pixels.
pub const OG_HEIGHT: u32 = 630;

const DEFAULT_BACKGROUND: &str = "#ffffff";
const FONT_FAMILY: &str = "Inter, sans-serif";
const NAME_FONT_SIZE: u32 = 64;
const DESCRIPTION_FONT_SIZE: u32 = 32;

/// The project fields a card is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMeta {
    /// Project name, rendered as the headline.
    pub name: String,
    /// Optional tagline under the name.
    #[serde(default)]
    pub description: Option<String>,
    /// Card background color.
    #[serde(default)]
    pub background_color: Option<String>,
}

/// Colors shared by every layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialStyle {
    /// Card background.
    pub background: String,
    /// Text color chosen for contrast against the background.
    pub text_color: TextColor,
}

/// Derive card colors from project metadata.
#[must_use]
pub fn compute_style(meta: &SocialMeta) -> SocialStyle {
    let background = meta
        .background_color
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_BACKGROUND)
        .to_string();
    let text_color = contrast_color(&background);
    SocialStyle {
        background,
        text_color,
    }
}

/// Everything a tier needs to compose one card.
pub struct TierContext<'a> {
    /// Project metadata.
    pub meta: &'a SocialMeta,
    /// Precomputed colors.
    pub style: &'a SocialStyle,
    /// Logo markup.
    pub logo_svg: &'a str,
    /// Parser options carrying the loaded font.
    pub options: &'a usvg::Options<'static>,
}

impl TierContext<'_> {
    /// Fail unless the logo decodes on its own.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Svg`] for undecodable logo markup.
    pub fn decode_logo(&self) -> RenderResult<()> {
        usvg::Tree::from_str(self.logo_svg, self.options)
            .map(drop)
            .map_err(|e| RenderError::Svg(format!("logo: {e}")))
    }

    /// The logo as a base64 `data:` URI.
    #[must_use]
    pub fn logo_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(self.logo_svg.as_bytes());
        format!("data:image/svg+xml;base64,{encoded}")
    }

    /// Parse a composed card to make sure it renders.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Layout`] if the card is not valid SVG.
    pub fn validate(&self, card: &str) -> RenderResult<()> {
        usvg::Tree::from_str(card, self.options)
            .map(drop)
            .map_err(|e| RenderError::Layout(e.to_string()))
    }

    fn open_card(&self) -> String {
        let mut svg = String::with_capacity(2048);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{OG_WIDTH}\" height=\"{OG_HEIGHT}\" viewBox=\"0 0 {OG_WIDTH} {OG_HEIGHT}\">",
        );
        let _ = write!(
            svg,
            "<rect width=\"{OG_WIDTH}\" height=\"{OG_HEIGHT}\" fill=\"{}\"/>",
            escape_xml(&self.style.background),
        );
        svg
    }

    fn push_logo(&self, svg: &mut String, x: u32, y: u32, size: u32) {
        let _ = write!(
            svg,
            "<image x=\"{x}\" y=\"{y}\" width=\"{size}\" height=\"{size}\" href=\"{}\"/>",
            self.logo_data_uri(),
        );
    }

    fn push_text(&self, svg: &mut String, text: &str, y: u32, font_size: u32, weight: u32, opacity: f32) {
        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{y}\" font-family=\"{FONT_FAMILY}\" font-size=\"{font_size}\" font-weight=\"{weight}\" fill=\"{}\" fill-opacity=\"{opacity}\" text-anchor=\"middle\">{}</text>",
            OG_WIDTH / 2,
            self.style.text_color.as_hex(),
            escape_xml(text),
        );
    }
}

/// One layout strategy in the fallback chain.
pub trait RenderTier: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Compose a card.
    ///
    /// # Errors
    ///
    /// Returns an error if this layout cannot be produced.
    fn render(&self, ctx: &TierContext<'_>) -> RenderResult<String>;
}

/// Logo on top, bold name, description below at reduced opacity.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullLayout;

impl RenderTier for FullLayout {
    fn name(&self) -> &'static str {
        "full-layout"
    }

    fn render(&self, ctx: &TierContext<'_>) -> RenderResult<String> {
        ctx.decode_logo()?;
        let mut svg = ctx.open_card();
        ctx.push_logo(&mut svg, (OG_WIDTH - 200) / 2, 100, 200);
        ctx.push_text(&mut svg, &ctx.meta.name, 400, NAME_FONT_SIZE, 800, 1.0);
        if let Some(description) = ctx.meta.description.as_deref().filter(|d| !d.is_empty()) {
            ctx.push_text(&mut svg, description, 464, DESCRIPTION_FONT_SIZE, 400, 0.8);
        }
        svg.push_str("</svg>");
        ctx.validate(&svg)?;
        Ok(svg)
    }
}

/// Large centered logo only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoOnly;

impl RenderTier for LogoOnly {
    fn name(&self) -> &'static str {
        "logo-only"
    }

    fn render(&self, ctx: &TierContext<'_>) -> RenderResult<String> {
        ctx.decode_logo()?;
        let mut svg = ctx.open_card();
        ctx.push_logo(&mut svg, (OG_WIDTH - 600) / 2, (OG_HEIGHT - 600) / 2, 600);
        svg.push_str("</svg>");
        ctx.validate(&svg)?;
        Ok(svg)
    }
}

/// Centered bold name, no logo.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOnly;

impl RenderTier for TextOnly {
    fn name(&self) -> &'static str {
        "text-only"
    }

    fn render(&self, ctx: &TierContext<'_>) -> RenderResult<String> {
        let mut svg = ctx.open_card();
        // Baseline offset so the cap height sits on the vertical center.
        let baseline = OG_HEIGHT / 2 + NAME_FONT_SIZE * 3 / 8;
        ctx.push_text(&mut svg, &ctx.meta.name, baseline, NAME_FONT_SIZE, 800, 1.0);
        svg.push_str("</svg>");
        ctx.validate(&svg)?;
        Ok(svg)
    }
}

/// The standard chain: full layout, then logo only, then text only.
#[must_use]
pub fn default_tiers() -> Vec<Box<dyn RenderTier>> {
    vec![Box::new(FullLayout), Box::new(LogoOnly), Box::new(TextOnly)]
}

/// A rendered card and how it was produced.
#[derive(Debug, Clone)]
pub struct SocialImage {
    /// SVG markup.
    pub svg: String,
    /// Name of the tier that produced it.
    pub tier: &'static str,
    /// Tiers that failed before it.
    pub failures: Vec<TierFailure>,
}

/// Server-side card renderer with tier fallback.
pub struct SocialImageRenderer {
    font: FontAsset,
    tiers: Vec<Box<dyn RenderTier>>,
}

impl SocialImageRenderer {
    /// Renderer with the standard tier chain.
    #[must_use]
    pub fn new(font: FontAsset) -> Self {
        Self::with_tiers(font, default_tiers())
    }

    /// Renderer with a custom ordered tier list.
    #[must_use]
    pub fn with_tiers(font: FontAsset, tiers: Vec<Box<dyn RenderTier>>) -> Self {
        Self { font, tiers }
    }

    /// Tier names in the order they are tried.
    #[must_use]
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Render a card, escalating through tiers until one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TiersExhausted`] listing every tier failure.
    #[tracing::instrument(skip_all, fields(name = %meta.name))]
    pub fn render(&self, meta: &SocialMeta, logo_svg: &str) -> RenderResult<SocialImage> {
        let style = compute_style(meta);
        let options = self.font.usvg_options();
        let ctx = TierContext {
            meta,
            style: &style,
            logo_svg,
            options: &options,
        };

        let mut failures = Vec::new();
        for tier in &self.tiers {
            match tier.render(&ctx) {
                Ok(svg) => {
                    tracing::debug!(tier = tier.name(), "Social image rendered");
                    return Ok(SocialImage {
                        svg,
                        tier: tier.name(),
                        failures,
                    });
                }
                Err(e) => {
                    tracing::warn!(tier = tier.name(), error = %e, "Render tier failed, trying next");
                    failures.push(TierFailure {
                        tier: tier.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Err(RenderError::TiersExhausted(failures))
    }
}

/// Single-layout card renderer used for previews and offline export.
#[derive(Debug, Clone, Default)]
pub struct PreviewRenderer {
    font: Option<FontAsset>,
}

impl PreviewRenderer {
    /// Preview renderer, optionally with a font for text.
    #[must_use]
    pub fn new(font: Option<FontAsset>) -> Self {
        Self { font }
    }

    /// Render the full layout, or return the logo markup unchanged on failure.
    #[must_use]
    pub fn render(&self, meta: &SocialMeta, logo_svg: &str) -> String {
        let style = compute_style(meta);
        let options = self
            .font
            .as_ref()
            .map(FontAsset::usvg_options)
            .unwrap_or_default();
        let ctx = TierContext {
            meta,
            style: &style,
            logo_svg,
            options: &options,
        };
        match FullLayout.render(&ctx) {
            Ok(svg) => svg,
            Err(e) => {
                tracing::warn!(error = %e, "Preview render failed, using logo markup");
                logo_svg.to_string()
            }
        }
    }
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 512 512"><circle cx="256" cy="256" r="200" fill="#ff0000"/></svg>"##;

    fn font() -> FontAsset {
        FontAsset::from_bytes("Tuffy.ttf", include_bytes!("../tests/fixtures/Tuffy.ttf").to_vec())
            .expect("fixture font")
    }

    fn meta(background: Option<&str>) -> SocialMeta {
        SocialMeta {
            name: "My Modern Project".into(),
            description: Some("A cutting-edge tech startup".into()),
            background_color: background.map(String::from),
        }
    }

    struct AlwaysFails(&'static str);

    impl RenderTier for AlwaysFails {
        fn name(&self) -> &'static str {
            self.0
        }

        fn render(&self, _ctx: &TierContext<'_>) -> RenderResult<String> {
            Err(RenderError::Layout(format!("{} is broken", self.0)))
        }
    }

    #[test]
    fn test_compute_style_defaults_to_white() {
        let style = compute_style(&meta(None));
        assert_eq!(style.background, "#ffffff");
        assert_eq!(style.text_color, TextColor::Black);

        let blank = compute_style(&meta(Some("  ")));
        assert_eq!(blank.background, "#ffffff");
    }

    #[test]
    fn test_compute_style_dark_background() {
        let style = compute_style(&meta(Some("#4F46E5")));
        assert_eq!(style.background, "#4F46E5");
        assert_eq!(style.text_color, TextColor::White);
    }

    #[test]
    fn test_full_layout_contents() {
        let renderer = SocialImageRenderer::new(font());
        let image = renderer
            .render(&meta(Some("#4F46E5")), LOGO)
            .expect("render");
        assert_eq!(image.tier, "full-layout");
        assert!(image.failures.is_empty());
        assert!(image.svg.contains("width=\"1200\""));
        assert!(image.svg.contains("height=\"630\""));
        assert!(image.svg.contains("My Modern Project"));
        assert!(image.svg.contains("A cutting-edge tech startup"));
        assert!(image.svg.contains("fill=\"#ffffff\""));
        assert!(image.svg.contains("fill-opacity=\"0.8\""));
        assert!(image.svg.contains("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_full_layout_without_description() {
        let mut m = meta(None);
        m.description = None;
        let image = SocialImageRenderer::new(font())
            .render(&m, LOGO)
            .expect("render");
        assert_eq!(image.svg.matches("<text").count(), 1);
    }

    #[test]
    fn test_name_is_escaped() {
        let mut m = meta(None);
        m.name = "<Acme & Co>".into();
        let image = SocialImageRenderer::new(font())
            .render(&m, LOGO)
            .expect("render");
        assert!(image.svg.contains("&lt;Acme &amp; Co&gt;"));
    }

    #[test]
    fn test_bad_logo_falls_back_to_text() {
        let image = SocialImageRenderer::new(font())
            .render(&meta(Some("#000")), "<svg><unclosed")
            .expect("render");
        assert_eq!(image.tier, "text-only");
        let failed: Vec<_> = image.failures.iter().map(|f| f.tier).collect();
        assert_eq!(failed, vec!["full-layout", "logo-only"]);
        assert!(image.svg.contains("My Modern Project"));
        assert!(!image.svg.contains("<image"));
    }

    #[test]
    fn test_custom_tier_order() {
        let renderer = SocialImageRenderer::with_tiers(
            font(),
            vec![Box::new(AlwaysFails("flaky")), Box::new(LogoOnly)],
        );
        assert_eq!(renderer.tier_names(), vec!["flaky", "logo-only"]);
        let image = renderer.render(&meta(None), LOGO).expect("render");
        assert_eq!(image.tier, "logo-only");
        assert!(!image.svg.contains("<text"));
    }

    #[test]
    fn test_tiers_exhausted() {
        let renderer = SocialImageRenderer::with_tiers(
            font(),
            vec![Box::new(AlwaysFails("first")), Box::new(AlwaysFails("second"))],
        );
        match renderer.render(&meta(None), LOGO) {
            Err(RenderError::TiersExhausted(failures)) => {
                let names: Vec<_> = failures.iter().map(|f| f.tier).collect();
                assert_eq!(names, vec!["first", "second"]);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_tier_list_is_exhausted() {
        let renderer = SocialImageRenderer::with_tiers(font(), Vec::new());
        assert!(matches!(
            renderer.render(&meta(None), LOGO),
            Err(RenderError::TiersExhausted(f)) if f.is_empty()
        ));
    }

    #[test]
    fn test_preview_renders_card() {
        let card = PreviewRenderer::new(None).render(&meta(Some("#ffffff")), LOGO);
        assert!(card.contains("width=\"1200\""));
        assert!(card.contains("fill=\"#000000\""));
    }

    #[test]
    fn test_preview_falls_back_to_logo() {
        let logo = "<svg><unclosed";
        let card = PreviewRenderer::new(Some(font())).render(&meta(None), logo);
        assert_eq!(card, logo);
    }
}
