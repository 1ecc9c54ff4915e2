use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::controller::FormError;
use super::domain::{FormKind, ImageStage};
use super::handlers::SubmissionHandlers;
use super::patch::FormUpdate;
use super::service::{FormId, FormService, FormServiceError};
use crate::workflows::requirements::{DocumentRequirement, JobScope};
use crate::workflows::validation::{UploadOutcome, UploadedFile};

/// Request bodies on upload routes may be this many times the policy limit, so oversize
/// files reach the policy and get its message instead of a bare 413.
const UPLOAD_BODY_FACTOR: u64 = 2;

/// Router builder exposing the requirement lookup and the form session endpoints.
pub fn form_router<H>(service: Arc<FormService<H>>) -> Router
where
    H: SubmissionHandlers + 'static,
{
    let body_limit = upload_body_limit(service.policy().max_file_bytes());

    Router::new()
        .route("/api/v1/requirements", get(requirements_handler::<H>))
        .route("/api/v1/forms", post(start_handler::<H>))
        .route(
            "/api/v1/forms/:form_id",
            get(view_handler::<H>)
                .patch(update_handler::<H>)
                .delete(discard_handler::<H>),
        )
        .route("/api/v1/forms/:form_id/next", post(next_handler::<H>))
        .route("/api/v1/forms/:form_id/prev", post(prev_handler::<H>))
        .route("/api/v1/forms/:form_id/step/:step", post(go_to_handler::<H>))
        .route(
            "/api/v1/forms/:form_id/documents/:requirement_id",
            post(upload_handler::<H>).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/v1/forms/:form_id/documents/:requirement_id/:index",
            axum::routing::delete(remove_document_handler::<H>),
        )
        .route(
            "/api/v1/forms/:form_id/images/:stage",
            post(stage_image_handler::<H>).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/v1/forms/:form_id/draft", post(draft_handler::<H>))
        .route("/api/v1/forms/:form_id/submit", post(submit_handler::<H>))
        .route("/api/v1/forms/:form_id/export", post(export_handler::<H>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequirementsQuery {
    #[serde(default)]
    scopes: Option<String>,
}

#[derive(Debug, Serialize)]
struct RequirementsResponse<'a> {
    job_scopes: Vec<JobScope>,
    documents: Vec<&'a DocumentRequirement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartFormRequest {
    kind: FormKind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StageImageQuery {
    name: String,
    #[serde(default)]
    captured_at: Option<NaiveDateTime>,
    #[serde(default)]
    gps: Option<String>,
}

fn upload_body_limit(max_file_bytes: u64) -> usize {
    usize::try_from(max_file_bytes.saturating_mul(UPLOAD_BODY_FACTOR)).unwrap_or(usize::MAX)
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    accepted: Vec<UploadedFile>,
    rejected: Vec<String>,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        let rejected = outcome.messages();
        Self {
            accepted: outcome.accepted,
            rejected,
        }
    }
}

pub(crate) async fn requirements_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Query(query): Query<RequirementsQuery>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    let job_scopes: Vec<JobScope> = query
        .scopes
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(JobScope::new)
        .filter(|scope| !scope.label().is_empty())
        .collect();
    let documents = service.matrix().required_documents(&job_scopes);

    let payload = RequirementsResponse {
        job_scopes,
        documents,
    };
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn start_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    axum::Json(request): axum::Json<StartFormRequest>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    let view = service.start(request.kind);
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn view_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    match service.view(&FormId(form_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
    axum::Json(update): axum::Json<FormUpdate>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    match service.update(&FormId(form_id), update) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn discard_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    match service.discard(&FormId(form_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn next_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    match service.next(&FormId(form_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn prev_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    match service.prev(&FormId(form_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn upload_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path((form_id, requirement_id)): Path<(String, String)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    let file = UploadedFile::new(query.name, content_type(&headers), body.to_vec());

    match service.attach_documents(&FormId(form_id), &requirement_id, vec![file]) {
        Ok(outcome) => {
            let status = if outcome.accepted.is_empty() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::CREATED
            };
            (status, axum::Json(UploadResponse::from(outcome))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn go_to_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path((form_id, step)): Path<(String, usize)>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    match service.go_to(&FormId(form_id), step) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn remove_document_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path((form_id, requirement_id, index)): Path<(String, String, usize)>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    match service.remove_document(&FormId(form_id), &requirement_id, index) {
        Ok(Some(file)) => (StatusCode::OK, axum::Json(file)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "error": format!("no upload at index {index} for '{requirement_id}'"),
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stage_image_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path((form_id, stage)): Path<(String, ImageStage)>,
    Query(query): Query<StageImageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    let file = UploadedFile::new(query.name, content_type(&headers), body.to_vec());

    match service.attach_stage_image(
        &FormId(form_id),
        stage,
        file,
        query.captured_at,
        query.gps,
    ) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn draft_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    let id = FormId(form_id);
    match service.save_draft(&id) {
        Ok(()) => accepted(&id, "draft_saved"),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    let id = FormId(form_id);
    match service.submit(&id) {
        Ok(_) => accepted(&id, "submitted"),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<H>(
    State(service): State<Arc<FormService<H>>>,
    Path(form_id): Path<String>,
) -> Response
where
    H: SubmissionHandlers + 'static,
{
    let id = FormId(form_id);
    match service.export_pdf(&id) {
        Ok(()) => accepted(&id, "export_requested"),
        Err(err) => error_response(err),
    }
}

fn accepted(id: &FormId, status: &str) -> Response {
    let payload = json!({
        "form_id": id.0,
        "status": status,
    });
    (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
}

fn error_response(err: FormServiceError) -> Response {
    let (status, payload) = match &err {
        FormServiceError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            json!({ "error": err.to_string() }),
        ),
        FormServiceError::Form(FormError::Incomplete {
            missing_documents,
            missing_fields,
        }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": err.to_string(),
                "missing_documents": missing_documents,
                "missing_fields": missing_fields,
            }),
        ),
        FormServiceError::Form(
            FormError::AlreadySubmitted | FormError::NotOnFinalStep { .. },
        ) => (StatusCode::CONFLICT, json!({ "error": err.to_string() })),
        FormServiceError::Form(FormError::Handler(_)) => {
            (StatusCode::BAD_GATEWAY, json!({ "error": err.to_string() }))
        }
        FormServiceError::Form(FormError::Upload(_)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": err.to_string() }),
        ),
        FormServiceError::Form(_) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
    };
    (status, axum::Json(payload)).into_response()
}
