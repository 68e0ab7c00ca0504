//! # Brandkit Server
//!
//! Local server and command line exporter for Brandkit.
//! Binds to localhost only.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use brandkit_core::{ColorMap, Project, ProjectRepository, ProjectStore};
use brandkit_renderer::{DirectorySink, ExportPipeline, FontAsset, SocialImageRenderer};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use brandkit_server::config::{Cli, Command, ExportArgs, ServeArgs};
use brandkit_server::{app, metrics, AppState, ServerConfig};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,brandkit_server=debug,tower_http=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,brandkit_server=debug,tower_http=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    match Cli::parse().into_command() {
        Command::Serve(args) => serve(args).await,
        Command::Export(args) => export(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let metrics_handle = metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to initialize Prometheus metrics: {}", e))?;
    tracing::info!("Prometheus metrics initialized");

    let config = ServerConfig::from(args);
    let port = config.port;

    let store = match &config.data_dir {
        Some(dir) => {
            let store = ProjectStore::with_data_dir(dir.clone())
                .with_context(|| format!("opening data directory {}", dir.display()))?;
            let loaded = store.load_all()?;
            tracing::info!(dir = %dir.display(), count = loaded.len(), "Projects loaded");
            store
        }
        None => ProjectStore::new(),
    };
    metrics::set_projects_active(store.list().len());

    if !config.font_path.is_file() {
        tracing::warn!(
            path = %config.font_path.display(),
            "Font not found; /api/generate-og will fail until it exists"
        );
    }

    let state = AppState::new(config, Arc::new(store));

    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = app(state).merge(metrics_router);

    // Bind to localhost ONLY
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Brandkit server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn export(args: ExportArgs) -> anyhow::Result<()> {
    let spec = args.export_spec()?;
    let raw_svg = tokio::fs::read_to_string(&args.svg)
        .await
        .with_context(|| format!("reading {}", args.svg.display()))?;

    let mut project = Project::new(args.name.clone(), &raw_svg);
    project.set_transform(args.scale, 0.0, 0.0)?;
    project.background_color.clone_from(&args.background);
    project.border_radius = args.border_radius;
    project.description.clone_from(&args.description);
    project.validate()?;

    let mut pipeline = ExportPipeline::with_defaults();
    if let Some(path) = &args.font_path {
        let font = FontAsset::load(path).await?;
        pipeline = pipeline.with_social(Arc::new(SocialImageRenderer::new(font)));
    }

    let sink = DirectorySink::new(&args.out);
    let path = pipeline
        .export_to(&sink, &project, &ColorMap::new(), &spec)
        .await?;

    println!("{}", path.display());
    Ok(())
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "metrics", skip(handle))]
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
