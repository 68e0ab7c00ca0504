//! Integration tests for the POST /api/projects/{id}/export endpoint and the
//! health checks.

mod common;

use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;

use brandkit_core::{LogoTransform, Project, ProjectRepository};
use brandkit_renderer::{IconRasterizer, RasterTarget, RenderError, RenderResult, ResvgRasterizer};
use common::{TestOptions, TestServer, LOGO};
use serde_json::json;

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

async fn export(server: &TestServer, project: &Project, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(server.url(&format!("/api/projects/{}/export", project.id)))
        .json(&body)
        .send()
        .await
        .expect("request")
}

// ==========================================================================
// Export
// ==========================================================================

#[tokio::test]
async fn test_export_returns_zip() {
    let server = TestServer::start().await;
    let project = server.seed(Project::new("Acme", LOGO));

    let resp = export(
        &server,
        &project,
        json!({ "sizes": [16, 32], "extraAssets": ["favicon", "manifest", "opengraph"] }),
    )
    .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/zip")
    );
    assert_eq!(
        resp.headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"Acme-assets.zip\"")
    );
    assert!(resp.headers().get("x-brandkit-failed-sizes").is_none());

    let bytes = resp.bytes().await.expect("body");
    let expected: BTreeSet<String> = [
        "Acme.svg",
        "manifest.json",
        "app.json",
        "icon-16.png",
        "icon-32.png",
        "favicon.ico",
        "opengraph-image.svg",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(entry_names(&bytes), expected);

    let manifest: serde_json::Value =
        serde_json::from_slice(&read_entry(&bytes, "manifest.json")).expect("manifest json");
    assert_eq!(manifest["name"], "Acme");
    assert_eq!(manifest["icons"].as_array().expect("icons").len(), 2);

    server.shutdown().await;
}

#[tokio::test]
async fn test_export_applies_unsaved_colors() {
    let server = TestServer::start().await;
    let project = server.seed(Project::new("Acme", LOGO));

    let resp = export(
        &server,
        &project,
        json!({ "sizes": [16], "extraAssets": [], "colors": { "#ff0000": "#0000ff" } }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let bytes = resp.bytes().await.expect("body");
    let svg = String::from_utf8(read_entry(&bytes, "Acme.svg")).expect("utf8");
    assert!(svg.contains("#0000ff"));

    // The stored logo is untouched
    let stored = server.store().get(project.id).expect("stored");
    assert!(stored.svg_content.contains("#ff0000"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_export_remembers_selection() {
    let server = TestServer::start().await;
    let project = server.seed(Project::new("Acme", LOGO));

    let resp = export(
        &server,
        &project,
        json!({ "sizes": [48, 16], "extraAssets": ["splash"] }),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let stored = server.store().get(project.id).expect("stored");
    assert_eq!(stored.selected_sizes, vec![16, 48]);
    assert_eq!(stored.selected_extra_assets.len(), 1);

    // An empty body reuses the saved selection
    let resp = export(&server, &project, json!({})).await;
    let bytes = resp.bytes().await.expect("body");
    let names = entry_names(&bytes);
    assert!(names.contains("icon-16.png"));
    assert!(names.contains("icon-48.png"));
    assert!(names.contains("splash.png"));
    assert!(!names.contains("favicon.ico"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_failed_size_reported_in_header() {
    let server = TestServer::start_with(TestOptions {
        rasterizer: Some(Arc::new(FailingSize {
            inner: ResvgRasterizer::new(),
            fail: 32,
        })),
        ..TestOptions::default()
    })
    .await;
    let project = server.seed(Project::new("Acme", LOGO));

    let resp = export(
        &server,
        &project,
        json!({ "sizes": [16, 32, 64], "extraAssets": [] }),
    )
    .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("x-brandkit-failed-sizes")
            .and_then(|v| v.to_str().ok()),
        Some("32")
    );
    let names = entry_names(&resp.bytes().await.expect("body"));
    assert!(names.contains("icon-16.png"));
    assert!(!names.contains("icon-32.png"));
    assert!(names.contains("icon-64.png"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_export_without_font_uses_preview_layout() {
    let server = TestServer::start_with(TestOptions {
        missing_font: true,
        ..TestOptions::default()
    })
    .await;
    let project = server.seed(Project::new("Acme", LOGO));

    let resp = export(
        &server,
        &project,
        json!({ "sizes": [16], "extraAssets": ["opengraph"] }),
    )
    .await;

    assert_eq!(resp.status(), 200);
    let bytes = resp.bytes().await.expect("body");
    let card = String::from_utf8(read_entry(&bytes, "opengraph-image.svg")).expect("utf8");
    assert!(card.contains("Acme"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_export_rejects_bad_sizes() {
    let server = TestServer::start().await;
    let project = server.seed(Project::new("Acme", LOGO));

    let resp = export(&server, &project, json!({ "sizes": [0] })).await;
    assert_eq!(resp.status(), 400);

    let resp = export(&server, &project, json!({ "sizes": [100000] })).await;
    assert_eq!(resp.status(), 400);

    server.shutdown().await;
}

#[tokio::test]
async fn test_export_keeps_entries_at_archive_root() {
    let server = TestServer::start().await;
    // Stored before names were restricted
    let project = server.seed(Project::new("../evil/sub", LOGO));

    let resp = export(&server, &project, json!({ "sizes": [16], "extraAssets": [] })).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\".._evil_sub-assets.zip\"")
    );
    let names = entry_names(&resp.bytes().await.expect("body"));
    assert!(names.contains(".._evil_sub.svg"));
    assert!(names.iter().all(|n| !n.contains('/') && !n.contains('\\')));

    server.shutdown().await;
}

#[tokio::test]
async fn test_export_unknown_project() {
    let server = TestServer::start().await;
    let project = Project::new("Ghost", LOGO);

    let resp = export(&server, &project, json!({})).await;
    assert_eq!(resp.status(), 404);

    server.shutdown().await;
}

// ==========================================================================
// Health
// ==========================================================================

#[tokio::test]
async fn test_health_ready_with_font() {
    let server = TestServer::start().await;

    let resp = reqwest::get(server.url("/health/ready"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["font_asset"], true);

    let resp = reqwest::get(server.url("/health/live"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);

    server.shutdown().await;
}

#[tokio::test]
async fn test_health_unready_without_font() {
    let server = TestServer::start_with(TestOptions {
        missing_font: true,
        ..TestOptions::default()
    })
    .await;

    let resp = reqwest::get(server.url("/health/ready"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["checks"]["font_asset"], false);

    server.shutdown().await;
}

#[tokio::test]
async fn test_health_unready_with_faceless_font() {
    let server = TestServer::start_with(TestOptions {
        invalid_font: true,
        ..TestOptions::default()
    })
    .await;

    let resp = reqwest::get(server.url("/health/ready"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["checks"]["font_asset"], false);
    assert_eq!(body["checks"]["project_store"], true);

    server.shutdown().await;
}

#[tokio::test]
async fn test_health_unready_without_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data_dir = dir.path().join("projects");
    let server = TestServer::start_with(TestOptions {
        data_dir: Some(data_dir.clone()),
        ..TestOptions::default()
    })
    .await;

    let resp = reqwest::get(server.url("/health/ready"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);

    std::fs::remove_dir_all(&data_dir).expect("remove data dir");

    let resp = reqwest::get(server.url("/health/ready"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.expect("json");
    assert_eq!(body["checks"]["project_store"], false);
    assert_eq!(body["checks"]["font_asset"], true);

    server.shutdown().await;
}
