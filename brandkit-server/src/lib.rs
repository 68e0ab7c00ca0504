//! # Brandkit Server Library
//!
//! Shared types and functionality for the brandkit server.
//! This library is used by both the binary and integration tests.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use brandkit_core::ProjectRepository;
use brandkit_renderer::{
    ExportPipeline, FontAsset, IconRasterizer, Packager, RenderResult, ResvgRasterizer,
    SocialImageRenderer, ZipPackager,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod validation;

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: Arc<ServerConfig>,
    /// Project repository.
    pub store: Arc<dyn ProjectRepository>,
    /// Icon rasterizer used for exports.
    pub rasterizer: Arc<dyn IconRasterizer>,
    /// Archive format used for exports.
    pub packager: Arc<dyn Packager>,
}

impl AppState {
    /// State with the resvg rasterizer and zip packaging.
    pub fn new(config: ServerConfig, store: Arc<dyn ProjectRepository>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            rasterizer: Arc::new(ResvgRasterizer::new()),
            packager: Arc::new(ZipPackager),
        }
    }

    /// Replace the rasterizer.
    #[must_use]
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn IconRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Get a reference to the project repository.
    pub fn store(&self) -> &dyn ProjectRepository {
        self.store.as_ref()
    }

    /// Read the configured typeface.
    ///
    /// # Errors
    ///
    /// Returns a font error if the file is missing or unreadable.
    pub async fn load_font(&self) -> RenderResult<FontAsset> {
        FontAsset::load(&self.config.font_path).await
    }

    /// Export pipeline sharing this state's rasterizer and packager.
    pub fn pipeline(&self, social: Option<Arc<SocialImageRenderer>>) -> ExportPipeline {
        let pipeline = ExportPipeline::new(Arc::clone(&self.rasterizer), Arc::clone(&self.packager));
        match social {
            Some(renderer) => pipeline.with_social(renderer),
            None => pipeline,
        }
    }
}

/// Build a CORS layer that only allows localhost origins.
fn build_cors_layer(port: u16) -> CorsLayer {
    let localhost_origins = [
        format!("http://localhost:{port}"),
        format!("http://127.0.0.1:{port}"),
        // Common dev server ports
        "http://localhost:3000".to_string(),
        "http://localhost:4321".to_string(), // Astro
        "http://localhost:5173".to_string(), // Vite
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:4321".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ];

    let origins: Vec<HeaderValue> = localhost_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
}

/// The application router with health checks, API routes and middleware.
///
/// The `/metrics` endpoint is merged separately by the binary because the
/// Prometheus recorder is process-global.
pub fn app(state: AppState) -> Router {
    let port = state.config.port;
    Router::new()
        // Health check endpoints (liveness and readiness)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .merge(routes::api_router())
        .layer(
            ServiceBuilder::new()
                // Request ID for tracing correlation
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(build_cors_layer(port)),
        )
        .with_state(state)
}
