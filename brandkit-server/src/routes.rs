//! API route handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use brandkit_core::{
    extract_colors, get_svg_dimensions, ColorMap, DisplayMode, ExportSpec, ExtraAsset,
    Orientation, Project, StoreError, SvgDimensions,
};
use brandkit_renderer::{RenderError, SocialImageRenderer, SocialMeta};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::metrics;
use crate::validation::{
    parse_project_id, validate_color_map, validate_description, validate_export_spec,
    validate_name, validate_optional_color, validate_project_name, validate_sizes, validate_svg,
    validate_svg_size, ValidationError,
    MAX_SVG_LEN,
};
use crate::AppState;

/// `Cache-Control` for social images; a card never changes for given input.
pub const OG_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Headroom over the logo limit for the rest of a JSON body.
const BODY_OVERHEAD: usize = 64 * 1024;

/// The `/api` routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/generate-og", post(generate_og))
        .route("/api/inspect", post(inspect))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route(
            "/api/projects/{id}/colors",
            get(get_colors).post(apply_colors),
        )
        .route("/api/projects/{id}/export", post(export_project))
        .layer(DefaultBodyLimit::max(MAX_SVG_LEN + BODY_OVERHEAD))
}

// ---------------------------------------------------------------------------
// Social images
// ---------------------------------------------------------------------------

/// Body of `POST /api/generate-og`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OgRequest {
    /// Card metadata.
    pub project: SocialMeta,
    /// Logo markup; an empty logo yields a text-only card.
    #[serde(default)]
    pub svg_content: String,
}

/// Render a social preview card.
#[tracing::instrument(name = "generate_og", skip_all)]
pub async fn generate_og(
    State(state): State<AppState>,
    payload: Result<Json<OgRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    validate_name(&request.project.name)?;
    validate_description(request.project.description.as_deref())?;
    validate_optional_color(request.project.background_color.as_deref())?;
    validate_svg_size(&request.svg_content)?;

    let font = state.load_font().await?;
    let renderer = SocialImageRenderer::new(font);
    let result = tokio::task::spawn_blocking(move || {
        renderer.render(&request.project, &request.svg_content)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("render task failed: {e}")))?;

    match result {
        Ok(image) => {
            for failure in &image.failures {
                metrics::record_tier_failure(failure.tier);
            }
            metrics::record_social_render(image.tier, true);
            Ok((
                [
                    (header::CONTENT_TYPE, "image/svg+xml"),
                    (header::CACHE_CONTROL, OG_CACHE_CONTROL),
                ],
                image.svg,
            )
                .into_response())
        }
        Err(e) => {
            if let RenderError::TiersExhausted(failures) = &e {
                for failure in failures {
                    metrics::record_tier_failure(failure.tier);
                }
            }
            metrics::record_social_render("none", false);
            Err(e.into())
        }
    }
}

/// Body of `POST /api/inspect`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectRequest {
    /// Logo markup.
    pub svg_content: String,
}

/// What the server sees in a logo before import.
#[derive(Debug, Serialize)]
pub struct InspectResponse {
    /// Intrinsic size.
    #[serde(flatten)]
    pub dimensions: SvgDimensions,
    /// Palette in first-seen order.
    pub colors: Vec<String>,
}

/// Report a logo's intrinsic size and palette.
#[tracing::instrument(name = "inspect", skip_all)]
pub async fn inspect(
    payload: Result<Json<InspectRequest>, JsonRejection>,
) -> Result<Json<InspectResponse>, ApiError> {
    let Json(request) = payload?;
    validate_svg(&request.svg_content)?;
    Ok(Json(InspectResponse {
        dimensions: get_svg_dimensions(&request.svg_content),
        colors: extract_colors(&request.svg_content),
    }))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Optional project fields shared by create and update.
///
/// Absent fields are left unchanged; an empty string clears a text field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    /// Logo zoom.
    pub logo_scale: Option<f32>,
    /// Horizontal pan.
    pub logo_x: Option<f32>,
    /// Vertical pan.
    pub logo_y: Option<f32>,
    /// Canvas background.
    pub background_color: Option<String>,
    /// Corner radius.
    pub border_radius: Option<f32>,
    /// Manifest short name.
    pub short_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Manifest theme color.
    pub theme_color: Option<String>,
    /// Manifest/splash background.
    pub app_background_color: Option<String>,
    /// Manifest display mode.
    pub display_mode: Option<DisplayMode>,
    /// Manifest orientation.
    pub orientation: Option<Orientation>,
    /// Manifest start URL.
    pub start_url: Option<String>,
    /// Saved export sizes.
    pub selected_sizes: Option<Vec<u32>>,
    /// Saved export extras.
    pub selected_extra_assets: Option<Vec<ExtraAsset>>,
}

fn set_text(field: &mut Option<String>, value: Option<&str>) {
    if let Some(v) = value {
        *field = Some(v.to_string()).filter(|s| !s.is_empty());
    }
}

impl ProjectSettings {
    fn apply(&self, project: &mut Project) -> Result<(), ValidationError> {
        validate_description(self.description.as_deref())?;
        for color in [
            &self.background_color,
            &self.theme_color,
            &self.app_background_color,
        ] {
            validate_optional_color(color.as_deref())?;
        }
        if let Some(sizes) = &self.selected_sizes {
            validate_sizes(&sizes.iter().copied().collect())?;
        }

        if self.logo_scale.is_some() || self.logo_x.is_some() || self.logo_y.is_some() {
            project.set_transform(
                self.logo_scale.unwrap_or(project.logo_scale),
                self.logo_x.unwrap_or(project.logo_x),
                self.logo_y.unwrap_or(project.logo_y),
            )?;
        }
        if let Some(radius) = self.border_radius {
            project.border_radius = Some(radius);
        }
        set_text(&mut project.background_color, self.background_color.as_deref());
        set_text(&mut project.short_name, self.short_name.as_deref());
        set_text(&mut project.description, self.description.as_deref());
        set_text(&mut project.theme_color, self.theme_color.as_deref());
        set_text(
            &mut project.app_background_color,
            self.app_background_color.as_deref(),
        );
        set_text(&mut project.start_url, self.start_url.as_deref());
        if let Some(mode) = self.display_mode {
            project.display_mode = Some(mode);
        }
        if let Some(orientation) = self.orientation {
            project.orientation = Some(orientation);
        }
        if let Some(sizes) = &self.selected_sizes {
            project.selected_sizes.clone_from(sizes);
        }
        if let Some(extras) = &self.selected_extra_assets {
            project.selected_extra_assets.clone_from(extras);
        }
        project.validate()?;
        Ok(())
    }
}

/// Body of `POST /api/projects`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Project name.
    pub name: String,
    /// Uploaded logo; canonicalized on import.
    pub svg_content: String,
    /// Remaining fields.
    #[serde(flatten)]
    pub settings: ProjectSettings,
}

/// Body of `PUT /api/projects/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    /// New name.
    pub name: Option<String>,
    /// Replacement logo.
    pub svg_content: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub settings: ProjectSettings,
}

impl UpdateProjectRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_project_name(name)?;
        }
        if let Some(svg) = &self.svg_content {
            validate_svg(svg)?;
        }
        Ok(())
    }

    /// Apply the present fields to a copy of `project`, replacing it only when
    /// every field is accepted.
    fn apply(&self, project: &mut Project) -> Result<(), ValidationError> {
        let mut next = project.clone();
        if let Some(name) = &self.name {
            next.name.clone_from(name);
        }
        if let Some(svg) = &self.svg_content {
            next.replace_logo(svg);
        }
        self.settings.apply(&mut next)?;
        next.touch();
        *project = next;
        Ok(())
    }
}

/// List all projects, most recently updated first.
#[tracing::instrument(name = "list_projects", skip(state))]
pub async fn list_projects(State(state): State<AppState>) -> Json<Vec<Project>> {
    Json(state.store().list())
}

/// Create a project from an uploaded logo.
#[tracing::instrument(name = "create_project", skip_all)]
pub async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let Json(request) = payload?;
    validate_project_name(&request.name)?;
    validate_svg(&request.svg_content)?;

    let mut project = Project::new(request.name, &request.svg_content);
    request.settings.apply(&mut project)?;

    let id = state.store().insert(project.clone())?;
    metrics::set_projects_active(state.store().list().len());
    tracing::info!(%id, name = %project.name, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// Fetch one project.
#[tracing::instrument(name = "get_project", skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let id = parse_project_id(&id)?;
    let project = state.store().get(id).ok_or(StoreError::NotFound(id))?;
    Ok(Json(project))
}

/// Update a project.
#[tracing::instrument(name = "update_project", skip(state, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> Result<Json<Project>, ApiError> {
    let id = parse_project_id(&id)?;
    let Json(request) = payload?;
    request.validate()?;

    // Applied to the stored record under the repository lock
    let mut rejected = None;
    let updated = state.store().update(id, &mut |stored: &mut Project| {
        if let Err(e) = request.apply(stored) {
            rejected = Some(e);
        }
    })?;
    if let Some(e) = rejected {
        return Err(e.into());
    }
    Ok(Json(updated))
}

/// Delete a project.
#[tracing::instrument(name = "delete_project", skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_project_id(&id)?;
    state.store().delete(id)?;
    metrics::set_projects_active(state.store().list().len());
    tracing::info!(%id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Palette response.
#[derive(Debug, Serialize)]
pub struct PaletteResponse {
    /// Distinct fill/stroke values in first-seen order.
    pub colors: Vec<String>,
}

/// Body of `POST /api/projects/{id}/colors`.
#[derive(Debug, Deserialize)]
pub struct ApplyColorsRequest {
    /// Original token to replacement token.
    pub colors: ColorMap,
}

/// Extract a project's palette.
#[tracing::instrument(name = "get_colors", skip(state))]
pub async fn get_colors(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaletteResponse>, ApiError> {
    let id = parse_project_id(&id)?;
    let project = state.store().get(id).ok_or(StoreError::NotFound(id))?;
    Ok(Json(PaletteResponse {
        colors: extract_colors(&project.svg_content),
    }))
}

/// Save color substitutions into a project's logo.
#[tracing::instrument(name = "apply_colors", skip(state, payload))]
pub async fn apply_colors(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ApplyColorsRequest>, JsonRejection>,
) -> Result<Json<Project>, ApiError> {
    let id = parse_project_id(&id)?;
    let Json(request) = payload?;
    validate_color_map(&request.colors)?;
    let updated = state
        .store()
        .update(id, &mut |project: &mut Project| {
            project.apply_colors(&request.colors);
        })?;
    Ok(Json(updated))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Body of `POST /api/projects/{id}/export`.
///
/// Missing sizes or extras fall back to the project's saved selection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Icon sizes.
    #[serde(default)]
    pub sizes: Option<BTreeSet<u32>>,
    /// Extra assets.
    #[serde(default)]
    pub extra_assets: Option<BTreeSet<ExtraAsset>>,
    /// Unsaved color substitutions to apply to this export only.
    #[serde(default)]
    pub colors: ColorMap,
}

/// Header listing icon sizes that failed to rasterize.
pub const FAILED_SIZES_HEADER: &str = "x-brandkit-failed-sizes";

/// Build and download a project's asset archive.
#[tracing::instrument(name = "export_project", skip(state, payload))]
pub async fn export_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_project_id(&id)?;
    let Json(request) = payload?;
    let project = state.store().get(id).ok_or(StoreError::NotFound(id))?;

    let mut spec = ExportSpec::from_project(&project);
    if let Some(sizes) = request.sizes {
        spec.sizes = sizes;
    }
    if let Some(extras) = request.extra_assets {
        spec.extra_assets = extras;
    }
    validate_export_spec(&spec)?;
    validate_color_map(&request.colors)?;

    let social = match state.load_font().await {
        Ok(font) => Some(Arc::new(SocialImageRenderer::new(font))),
        Err(e) => {
            tracing::warn!(error = %e, "Font unavailable, using preview layout for social image");
            None
        }
    };

    let artifact = match state
        .pipeline(social)
        .export(&project, &request.colors, &spec)
        .await
    {
        Ok(artifact) => artifact,
        Err(e) => {
            metrics::record_export("failure");
            return Err(e.into());
        }
    };
    metrics::record_export("success");
    metrics::record_raster_failures(artifact.failed_sizes.len());

    let saved = state.store().update(id, &mut |p: &mut Project| {
        p.selected_sizes = spec.sorted_sizes();
        p.selected_extra_assets = spec.extra_assets.iter().copied().collect();
    });
    if let Err(e) = saved {
        tracing::warn!(%id, error = %e, "Could not save export selection");
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&artifact.file_name),
    );
    if !artifact.failed_sizes.is_empty() {
        let failed = artifact
            .failed_sizes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        if let Ok(value) = HeaderValue::from_str(&failed) {
            headers.insert(FAILED_SIZES_HEADER, value);
        }
    }
    Ok((StatusCode::OK, headers, artifact.bytes).into_response())
}

/// `attachment; filename="..."`, falling back to a bare `attachment` for
/// names that can't be sent in a header.
fn content_disposition(file_name: &str) -> HeaderValue {
    let quoted = file_name.replace(['"', '\\'], "_");
    HeaderValue::from_str(&format!("attachment; filename=\"{quoted}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
