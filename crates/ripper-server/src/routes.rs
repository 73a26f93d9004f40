use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio_util::io::ReaderStream;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ripper_core::{AppError, JobId};

use crate::dto::{ConvertRequestBody, ConvertResponse, HealthResponse, StatusResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Submissions are a handful of URLs; anything bigger is not a real client.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/convert", post(convert))
        .route("/api/status/{job_id}", get(status))
        .route("/api/download/{job_id}/{filename}", get(download))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/convert",
    request_body = ConvertRequestBody,
    responses(
        (status = 202, description = "Job queued", body = ConvertResponse),
        (status = 400, description = "Invalid submission", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    payload: Result<axum::Json<ConvertRequestBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let axum::Json(body) =
        payload.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;
    let source = body.source.clone().unwrap_or_else(|| "youtube".to_string());
    let browser = body.browser.clone().unwrap_or_default();

    let request = state
        .service
        .prepare(body.into_urls(), &source, &browser)?;
    let job_id = state.service.submit(request)?;

    let response = ConvertResponse {
        job_id: job_id.to_string(),
    };

    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/status/{job_id}",
    params(
        ("job_id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status", body = StatusResponse),
        (status = 404, description = "Unknown or expired job", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.service.status(&JobId::from(job_id))?;
    Ok(axum::Json(StatusResponse::from(job)))
}

#[utoipa::path(
    get,
    path = "/api/download/{job_id}/{filename}",
    params(
        ("job_id" = String, Path, description = "Job ID"),
        ("filename" = String, Path, description = "One of the job's files"),
    ),
    responses(
        (status = 200, description = "MP3 attachment", body = Vec<u8>, content_type = "audio/mpeg"),
        (status = 404, description = "Unknown job or file", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path((job_id, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let job_id = JobId::from(job_id);
    let path = state.service.artifact_path(&job_id, &filename)?;

    // the sweeper may have removed it between lookup and open
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::FileNotFound {
                job_id: job_id.to_string(),
                filename: filename.clone(),
            }
        } else {
            AppError::Io(e)
        }
    })?;
    let length = file.metadata().await.map_err(AppError::Io)?.len();

    let disposition = format!(
        "attachment; filename=\"{}\"",
        filename.replace(['"', '\\'], "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        jobs: state.service.store().len(),
    };

    axum::Json(response)
}
