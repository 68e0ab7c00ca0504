//! Icon rasterization.
//!
//! Draws a canonical logo onto a square (or tall, for splash screens) canvas
//! under the project's pan/zoom/background/corner-radius transform and
//! encodes the result as PNG.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use brandkit_core::{LogoTransform, RasterResult, CANONICAL_SIZE};
use tiny_skia::{FillRule, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Transform};

use crate::error::{RenderError, RenderResult};

/// Canvas to draw into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterTarget {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Extra zoom on top of the project's logo scale.
    pub zoom_factor: f32,
}

impl RasterTarget {
    /// A canvas of arbitrary shape.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            zoom_factor: 1.0,
        }
    }

    /// A square icon canvas.
    #[must_use]
    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// Set the additional zoom factor.
    #[must_use]
    pub const fn with_zoom(mut self, zoom_factor: f32) -> Self {
        self.zoom_factor = zoom_factor;
        self
    }

    /// Pixels per canonical unit, derived from the canvas width.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn unit_ratio(&self) -> f32 {
        self.width as f32 / CANONICAL_SIZE
    }
}

/// Turns logo markup into encoded raster images.
pub trait IconRasterizer: Send + Sync {
    /// Rasterize `svg` into `target` and return PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup cannot be decoded, the canvas cannot be
    /// allocated, or encoding fails.
    fn rasterize(
        &self,
        svg: &str,
        target: RasterTarget,
        transform: &LogoTransform,
    ) -> RenderResult<Vec<u8>>;
}

/// [`IconRasterizer`] backed by resvg and tiny-skia.
#[derive(Clone, Default)]
pub struct ResvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl fmt::Debug for ResvgRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResvgRasterizer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

impl ResvgRasterizer {
    /// Create a rasterizer with an empty font database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a font available to `<text>` elements inside logos.
    #[must_use]
    pub fn with_font_data(mut self, data: Vec<u8>) -> Self {
        Arc::make_mut(&mut self.fontdb).load_font_data(data);
        self
    }

    fn parse(&self, svg: &str) -> RenderResult<usvg::Tree> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        usvg::Tree::from_str(svg, &options).map_err(|e| RenderError::Svg(e.to_string()))
    }
}

impl IconRasterizer for ResvgRasterizer {
    #[allow(clippy::cast_precision_loss)]
    fn rasterize(
        &self,
        svg: &str,
        target: RasterTarget,
        transform: &LogoTransform,
    ) -> RenderResult<Vec<u8>> {
        let tree = self.parse(svg)?;

        let RasterTarget { width, height, .. } = target;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Raster(format!("invalid canvas size {width}x{height}")))?;
        let (w, h) = (width as f32, height as f32);

        let clip = rounded_rect(w, h, transform.border_radius * target.unit_ratio())?;
        let mut mask = Mask::new(width, height)
            .ok_or_else(|| RenderError::Raster("failed to allocate clip mask".to_string()))?;
        mask.fill_path(&clip, FillRule::Winding, true, Transform::identity());

        if let Some(background) = transform.background_color.as_deref() {
            match svgtypes::Color::from_str(background.trim()) {
                Ok(c) => {
                    let mut paint = Paint::default();
                    paint.set_color_rgba8(c.red, c.green, c.blue, c.alpha);
                    paint.anti_alias = true;
                    pixmap.fill_path(
                        &clip,
                        &paint,
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
                Err(e) => tracing::warn!(
                    color = background,
                    error = %e,
                    "Unsupported background color, leaving canvas transparent"
                ),
            }
        }

        let mut layer = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Raster("failed to allocate logo layer".to_string()))?;
        resvg::render(
            &tree,
            logo_transform(&tree, target, transform),
            &mut layer.as_mut(),
        );
        pixmap.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            Some(&mask),
        );

        pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))
    }
}

/// Map the decoded tree onto the canvas.
///
/// The logo is drawn as a `width x width` box centered on the canvas, shifted
/// by the pan offset and scaled around the center.
fn logo_transform(tree: &usvg::Tree, target: RasterTarget, transform: &LogoTransform) -> Transform {
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (target.width as f32, target.height as f32);
    let ratio = target.unit_ratio();
    let size = tree.size();
    let zoom = transform.scale * target.zoom_factor;

    Transform::from_translate(
        w / 2.0 + transform.x * ratio,
        h / 2.0 + transform.y * ratio,
    )
    .pre_scale(zoom, zoom)
    .pre_translate(-w / 2.0, -w / 2.0)
    .pre_scale(w / size.width(), w / size.height())
}

/// Canvas outline with quadratic corners; a radius of zero is a plain rect.
fn rounded_rect(w: f32, h: f32, radius: f32) -> RenderResult<Path> {
    let r = radius.clamp(0.0, w.min(h) / 2.0);
    let invalid = || RenderError::Raster(format!("invalid canvas outline {w}x{h}"));

    if r <= 0.0 {
        let rect = Rect::from_xywh(0.0, 0.0, w, h).ok_or_else(invalid)?;
        return Ok(PathBuilder::from_rect(rect));
    }

    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(w - r, 0.0);
    pb.quad_to(w, 0.0, w, r);
    pb.line_to(w, h - r);
    pb.quad_to(w, h, w - r, h);
    pb.line_to(r, h);
    pb.quad_to(0.0, h, 0.0, h - r);
    pb.line_to(0.0, r);
    pb.quad_to(0.0, 0.0, r, 0.0);
    pb.close();
    pb.finish().ok_or_else(invalid)
}

/// Rasterize one target on the blocking pool.
///
/// # Errors
///
/// Returns the rasterizer's error, or [`RenderError::Raster`] if the task
/// panicked.
pub async fn rasterize_target(
    rasterizer: Arc<dyn IconRasterizer>,
    svg: Arc<str>,
    target: RasterTarget,
    transform: LogoTransform,
) -> RenderResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&svg, target, &transform))
        .await
        .map_err(|e| RenderError::Raster(format!("raster task failed: {e}")))?
}

/// Rasterize every size concurrently.
///
/// Results come back in the order of `sizes`. A size that fails is logged
/// and reported with `bytes: None`; it never fails the batch.
pub async fn rasterize_sizes(
    rasterizer: Arc<dyn IconRasterizer>,
    svg: Arc<str>,
    sizes: &[u32],
    transform: &LogoTransform,
) -> Vec<RasterResult> {
    let tasks = sizes.iter().map(|&size| {
        let task = rasterize_target(
            Arc::clone(&rasterizer),
            Arc::clone(&svg),
            RasterTarget::square(size),
            transform.clone(),
        );
        async move {
            match task.await {
                Ok(bytes) => RasterResult::ok(size, bytes),
                Err(e) => {
                    tracing::warn!(size, error = %e, "Icon rasterization failed, skipping size");
                    RasterResult::failed(size)
                }
            }
        }
    });
    futures::future::join_all(tasks).await
}
