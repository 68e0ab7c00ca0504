//! Integration tests for the export pipeline.
//!
//! Exercises the full recolor, rasterize, extras and zip path and checks the
//! archive contents with `zip::ZipArchive`.

use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;

use brandkit_core::{ColorMap, ExportSpec, ExtraAsset, LogoTransform, Project};
use brandkit_renderer::{
    AssetBundle, DirectorySink, ExportPipeline, FontAsset, IconRasterizer, Packager,
    RasterTarget, RenderError, RenderResult, ResvgRasterizer, SocialImageRenderer, ZipPackager,
};

const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><circle cx="12" cy="12" r="10" fill="#ff0000"/></svg>"##;

fn spec(sizes: &[u32], extras: &[ExtraAsset]) -> ExportSpec {
    ExportSpec {
        sizes: sizes.iter().copied().collect(),
        extra_assets: extras.iter().copied().collect(),
    }
}

fn entry_names(bytes: &[u8]) -> BTreeSet<String> {
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("valid zip");
    archive.file_names().map(String::from).collect()
}

fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("valid zip");
    let mut file = archive.by_name(name).expect("entry present");
    let mut out = Vec::new();
    file.read_to_end(&mut out).expect("read entry");
    out
}

/// Delegates to resvg but fails one size.
struct FailingSize {
    inner: ResvgRasterizer,
    fail: u32,
}

impl IconRasterizer for FailingSize {
    fn rasterize(
        &self,
        svg: &str,
        target: RasterTarget,
        transform: &LogoTransform,
    ) -> RenderResult<Vec<u8>> {
        if target.width == self.fail && target.height == self.fail {
            return Err(RenderError::Raster("engineered failure".into()));
        }
        self.inner.rasterize(svg, target, transform)
    }
}

struct BrokenPackager;

impl Packager for BrokenPackager {
    fn pack(&self, _bundle: &AssetBundle) -> RenderResult<Vec<u8>> {
        Err(RenderError::Package("disk full".into()))
    }

    fn extension(&self) -> &str {
        "zip"
    }
}

// ==========================================================================
// Success cases
// ==========================================================================

#[tokio::test]
async fn test_export_full_archive() {
    let project = Project::new("Acme", LOGO);
    let artifact = ExportPipeline::with_defaults()
        .export(&project, &ColorMap::new(), &ExportSpec::default())
        .await
        .expect("export");

    assert_eq!(artifact.file_name, "Acme-assets.zip");
    assert!(artifact.failed_sizes.is_empty());

    let names = entry_names(&artifact.bytes);
    for expected in [
        "Acme.svg",
        "manifest.json",
        "app.json",
        "icon-16.png",
        "icon-32.png",
        "icon-64.png",
        "icon-128.png",
        "icon-192.png",
        "icon-512.png",
        "icon-1024.png",
        "splash.png",
        "favicon.ico",
        "opengraph-image.svg",
    ] {
        assert!(names.contains(expected), "missing {expected}");
    }
    assert_eq!(names.len(), artifact.entries.len());

    let ico = read_entry(&artifact.bytes, "favicon.ico");
    assert_eq!(&ico[0..4], &[0, 0, 1, 0]);

    let splash = image::load_from_memory(&read_entry(&artifact.bytes, "splash.png"))
        .expect("splash png");
    assert_eq!((splash.width(), splash.height()), (1080, 1920));
}

#[tokio::test]
async fn test_export_entry_order() {
    let project = Project::new("Acme", LOGO);
    let artifact = ExportPipeline::with_defaults()
        .export(
            &project,
            &ColorMap::new(),
            &spec(&[32, 16], &[ExtraAsset::Splash, ExtraAsset::Favicon, ExtraAsset::OpenGraph]),
        )
        .await
        .expect("export");
    assert_eq!(
        artifact.entries,
        vec![
            "Acme.svg",
            "manifest.json",
            "app.json",
            "icon-16.png",
            "icon-32.png",
            "splash.png",
            "favicon.ico",
            "opengraph-image.svg",
        ]
    );
}

#[tokio::test]
async fn test_descriptors_always_present() {
    let project = Project::new("Acme", LOGO);
    let artifact = ExportPipeline::with_defaults()
        .export(&project, &ColorMap::new(), &spec(&[16], &[]))
        .await
        .expect("export");
    assert_eq!(
        entry_names(&artifact.bytes),
        ["Acme.svg", "app.json", "icon-16.png", "manifest.json"]
            .into_iter()
            .map(String::from)
            .collect::<BTreeSet<String>>()
    );

    let manifest: serde_json::Value =
        serde_json::from_slice(&read_entry(&artifact.bytes, "manifest.json")).expect("json");
    assert_eq!(manifest["name"], "Acme");
    assert_eq!(manifest["icons"].as_array().map(Vec::len), Some(1));

    let app: serde_json::Value =
        serde_json::from_slice(&read_entry(&artifact.bytes, "app.json")).expect("json");
    assert_eq!(app["expo"]["slug"], "acme");
}

#[tokio::test]
async fn test_colors_applied_to_archived_svg() {
    let project = Project::new("Acme", LOGO);
    let colors: ColorMap = [("#ff0000".to_string(), "#00ff00".to_string())]
        .into_iter()
        .collect();
    let artifact = ExportPipeline::with_defaults()
        .export(&project, &colors, &spec(&[16], &[]))
        .await
        .expect("export");

    let svg = String::from_utf8(read_entry(&artifact.bytes, "Acme.svg")).expect("utf8");
    assert!(svg.contains("#00ff00"));
    assert!(!svg.contains("#ff0000"));
    assert!(svg.contains(r#"viewBox="0 0 512 512""#));
}

#[tokio::test]
async fn test_social_renderer_used_for_opengraph() {
    let mut project = Project::new("Acme", LOGO);
    project.description = Some("Rockets".into());
    let font = FontAsset::from_bytes("Tuffy.ttf", include_bytes!("fixtures/Tuffy.ttf").to_vec())
        .expect("fixture font");
    let pipeline =
        ExportPipeline::with_defaults().with_social(Arc::new(SocialImageRenderer::new(font)));

    let artifact = pipeline
        .export(&project, &ColorMap::new(), &spec(&[16], &[ExtraAsset::OpenGraph]))
        .await
        .expect("export");
    let card = String::from_utf8(read_entry(&artifact.bytes, "opengraph-image.svg"))
        .expect("utf8");
    assert!(card.contains("width=\"1200\""));
    assert!(card.contains("Acme"));
    assert!(card.contains("Rockets"));
}

#[tokio::test]
async fn test_project_name_cannot_escape_archive_root() {
    let project = Project::new("../evil/sub", LOGO);
    let artifact = ExportPipeline::with_defaults()
        .export(&project, &ColorMap::new(), &spec(&[16], &[]))
        .await
        .expect("export");

    assert_eq!(artifact.file_name, ".._evil_sub-assets.zip");
    let names = entry_names(&artifact.bytes);
    assert!(names.contains(".._evil_sub.svg"));
    for name in &names {
        assert!(!name.contains('/') && !name.contains('\\'), "{name} is nested");
    }
}

// ==========================================================================
// Failure tolerance
// ==========================================================================

#[tokio::test]
async fn test_failing_size_is_excluded() {
    let project = Project::new("Acme", LOGO);
    let rasterizer = Arc::new(FailingSize {
        inner: ResvgRasterizer::new(),
        fail: 32,
    });
    let pipeline = ExportPipeline::new(rasterizer, Arc::new(ZipPackager));

    let artifact = pipeline
        .export(&project, &ColorMap::new(), &spec(&[16, 32, 64], &[]))
        .await
        .expect("export must not fail");

    assert_eq!(artifact.failed_sizes, vec![32]);
    let names = entry_names(&artifact.bytes);
    assert!(names.contains("icon-16.png"));
    assert!(names.contains("icon-64.png"));
    assert!(!names.contains("icon-32.png"));
}

#[tokio::test]
async fn test_failing_favicon_size_skips_favicon_only() {
    let project = Project::new("Acme", LOGO);
    let rasterizer = Arc::new(FailingSize {
        inner: ResvgRasterizer::new(),
        fail: 32,
    });
    let pipeline = ExportPipeline::new(rasterizer, Arc::new(ZipPackager));

    let artifact = pipeline
        .export(
            &project,
            &ColorMap::new(),
            &spec(&[16], &[ExtraAsset::Favicon, ExtraAsset::Splash]),
        )
        .await
        .expect("export");
    let names = entry_names(&artifact.bytes);
    assert!(!names.contains("favicon.ico"));
    assert!(names.contains("splash.png"));
}

#[tokio::test]
async fn test_undecodable_logo_still_exports() {
    let mut project = Project::new("Broken", LOGO);
    project.svg_content = "<svg><unclosed".into();

    let artifact = ExportPipeline::with_defaults()
        .export(
            &project,
            &ColorMap::new(),
            &spec(&[16, 32], &[ExtraAsset::Splash, ExtraAsset::OpenGraph]),
        )
        .await
        .expect("export");

    assert_eq!(artifact.failed_sizes, vec![16, 32]);
    let names = entry_names(&artifact.bytes);
    assert!(names.contains("Broken.svg"));
    assert!(!names.contains("splash.png"));
    // Preview failure degrades to the logo markup.
    assert_eq!(
        read_entry(&artifact.bytes, "opengraph-image.svg"),
        b"<svg><unclosed"
    );
}

#[tokio::test]
async fn test_packaging_failure_is_fatal() {
    let project = Project::new("Acme", LOGO);
    let pipeline = ExportPipeline::new(Arc::new(ResvgRasterizer::new()), Arc::new(BrokenPackager));
    let result = pipeline
        .export(&project, &ColorMap::new(), &spec(&[16], &[]))
        .await;
    assert!(matches!(result, Err(RenderError::Package(_))));
}

#[tokio::test]
async fn test_export_to_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = DirectorySink::new(dir.path());
    let project = Project::new("Acme", LOGO);

    let path = ExportPipeline::with_defaults()
        .export_to(&sink, &project, &ColorMap::new(), &spec(&[16], &[]))
        .await
        .expect("export");

    assert_eq!(path, dir.path().join("Acme-assets.zip"));
    let bytes = std::fs::read(&path).expect("read archive");
    assert!(entry_names(&bytes).contains("icon-16.png"));
}
