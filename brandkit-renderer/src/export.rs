//! The asset export pipeline.
//!
//! Recolors the logo, generates the descriptors, rasterizes every icon size
//! concurrently, renders the optional extras and packs everything into one
//! archive. Individual assets that fail are logged and left out; only a
//! packaging failure fails the export.

use std::path::PathBuf;
use std::sync::Arc;

use brandkit_core::manifest::to_pretty_json;
use brandkit_core::{
    generate_app_json, generate_manifest, recolor, ColorMap, ExportSpec, ExtraAsset,
    LogoTransform, Project,
};
use image::ImageEncoder;
use serde::Serialize;

use crate::error::{RenderError, RenderResult};
use crate::package::{archive_file_name, ArchiveSink, AssetBundle, Packager, ZipPackager};
use crate::raster::{
    rasterize_sizes, rasterize_target, IconRasterizer, RasterTarget, ResvgRasterizer,
};
use crate::social::{PreviewRenderer, SocialImageRenderer, SocialMeta};

/// Splash screen canvas: portrait phone, logo at half width.
pub const SPLASH_TARGET: RasterTarget = RasterTarget {
    width: 1080,
    height: 1920,
    zoom_factor: 0.5,
};

/// Favicon edge length in pixels.
pub const FAVICON_SIZE: u32 = 32;

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// Suggested download name, `{name}-assets.zip`.
    pub file_name: String,
    /// Archive bytes.
    pub bytes: Vec<u8>,
    /// Files in the archive, in order.
    pub entries: Vec<String>,
    /// Icon sizes that failed to rasterize.
    pub failed_sizes: Vec<u32>,
}

/// Builds brand asset archives from projects.
pub struct ExportPipeline {
    rasterizer: Arc<dyn IconRasterizer>,
    packager: Arc<dyn Packager>,
    social: Option<Arc<SocialImageRenderer>>,
    preview: PreviewRenderer,
}

impl ExportPipeline {
    /// Pipeline with a custom rasterizer and packager.
    #[must_use]
    pub fn new(rasterizer: Arc<dyn IconRasterizer>, packager: Arc<dyn Packager>) -> Self {
        Self {
            rasterizer,
            packager,
            social: None,
            preview: PreviewRenderer::default(),
        }
    }

    /// resvg rasterization into zip archives.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ResvgRasterizer::new()), Arc::new(ZipPackager))
    }

    /// Use the tiered server renderer for the social image.
    #[must_use]
    pub fn with_social(mut self, social: Arc<SocialImageRenderer>) -> Self {
        self.social = Some(social);
        self
    }

    /// Replace the preview renderer used when no server renderer is set.
    #[must_use]
    pub fn with_preview(mut self, preview: PreviewRenderer) -> Self {
        self.preview = preview;
        self
    }

    /// Produce the asset archive for a project.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Package`] if the archive cannot be built.
    #[tracing::instrument(skip_all, fields(project = %project.name, sizes = spec.sizes.len()))]
    pub async fn export(
        &self,
        project: &Project,
        colors: &ColorMap,
        spec: &ExportSpec,
    ) -> RenderResult<ExportArtifact> {
        let svg: Arc<str> = Arc::from(recolor(&project.svg_content, colors));
        let sizes = spec.sorted_sizes();
        let transform = project.transform();

        let mut bundle = AssetBundle::new();
        bundle.add(&format!("{}.svg", project.name), svg.as_bytes());
        add_json(&mut bundle, "manifest.json", &generate_manifest(project, &sizes));
        add_json(&mut bundle, "app.json", &generate_app_json(project, &sizes));

        let rasters =
            rasterize_sizes(Arc::clone(&self.rasterizer), Arc::clone(&svg), &sizes, &transform)
                .await;
        bundle.add_rasters(&rasters);
        let failed_sizes: Vec<u32> = rasters
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.size)
            .collect();

        if spec.wants(ExtraAsset::Splash) {
            match self.raster(&svg, SPLASH_TARGET, &transform).await {
                Ok(png) => bundle.add("splash.png", png),
                Err(e) => tracing::warn!(error = %e, "Splash screen failed, skipping"),
            }
        }

        if spec.wants(ExtraAsset::Favicon) {
            let favicon = self
                .raster(&svg, RasterTarget::square(FAVICON_SIZE), &transform)
                .await
                .and_then(|png| png_to_ico(&png));
            match favicon {
                Ok(ico) => bundle.add("favicon.ico", ico),
                Err(e) => tracing::warn!(error = %e, "Favicon failed, skipping"),
            }
        }

        if spec.wants(ExtraAsset::OpenGraph) {
            let card = self.social_card(project, &svg).await;
            bundle.add("opengraph-image.svg", card);
        }

        let bytes = self.packager.pack(&bundle)?;
        let artifact = ExportArtifact {
            file_name: archive_file_name(&project.name, self.packager.extension()),
            bytes,
            entries: bundle.names(),
            failed_sizes,
        };
        tracing::info!(
            file = %artifact.file_name,
            entries = artifact.entries.len(),
            failed = artifact.failed_sizes.len(),
            "Export complete"
        );
        Ok(artifact)
    }

    /// Export and hand the archive to a sink.
    ///
    /// # Errors
    ///
    /// Returns packaging errors from [`ExportPipeline::export`] or the sink's
    /// write error.
    pub async fn export_to(
        &self,
        sink: &dyn ArchiveSink,
        project: &Project,
        colors: &ColorMap,
        spec: &ExportSpec,
    ) -> RenderResult<PathBuf> {
        let artifact = self.export(project, colors, spec).await?;
        sink.save(&artifact.file_name, &artifact.bytes).await
    }

    async fn raster(
        &self,
        svg: &Arc<str>,
        target: RasterTarget,
        transform: &LogoTransform,
    ) -> RenderResult<Vec<u8>> {
        rasterize_target(
            Arc::clone(&self.rasterizer),
            Arc::clone(svg),
            target,
            transform.clone(),
        )
        .await
    }

    /// Social card markup, degrading to the logo itself on failure.
    async fn social_card(&self, project: &Project, svg: &Arc<str>) -> String {
        let meta = SocialMeta {
            name: project.name.clone(),
            description: project.description.clone(),
            background_color: project.background_color.clone(),
        };
        let logo = Arc::clone(svg);
        let social = self.social.clone();
        let preview = self.preview.clone();

        let rendered = tokio::task::spawn_blocking(move || match social {
            Some(renderer) => renderer.render(&meta, &logo).map(|image| image.svg),
            None => Ok(preview.render(&meta, &logo)),
        })
        .await;

        match rendered {
            Ok(Ok(card)) => card,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Social image failed, archiving logo markup");
                svg.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Social image task failed, archiving logo markup");
                svg.to_string()
            }
        }
    }
}

fn add_json<T: Serialize>(bundle: &mut AssetBundle, name: &str, document: &T) {
    match to_pretty_json(document) {
        Ok(json) => bundle.add(name, json),
        Err(e) => tracing::warn!(file = name, error = %e, "Descriptor serialization failed"),
    }
}

/// Re-encode a PNG as a single-image ICO.
fn png_to_ico(png: &[u8]) -> RenderResult<Vec<u8>> {
    let image = image::load_from_memory(png)
        .map_err(|e| RenderError::Encode(format!("PNG decoding failed: {e}")))?
        .to_rgba8();
    let mut buf = Vec::new();
    image::codecs::ico::IcoEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| RenderError::Encode(format!("ICO encoding failed: {e}")))?;
    Ok(buf)
}
