// handler/job.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::jobdtos::*,
    error::HttpError,
    handler::{json_body, minor_amount, optional_json_body, payment::payment_handler},
    models::jobmodel::Actor,
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route("/", post(create_job))
        .route("/:job_id", get(get_job))
        .route("/:job_id/accept", put(accept_job))
        .route("/:job_id/start", put(start_job))
        .route("/:job_id/complete", put(complete_job))
        .route("/:job_id/cancel", put(cancel_job))
        .route("/:job_id/invoice", post(generate_invoice))
        .nest("/:job_id/payment", payment_handler())
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateJobDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let draft = body
        .into_new_job()
        .ok_or_else(|| HttpError::bad_request("Budget is out of range"))?;

    let job = app_state.job_service.create_job(&actor, draft).await?;

    Ok(Json(ApiResponse::success(
        "Job created successfully",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.get_job(job_id, &actor).await?;

    Ok(Json(ApiResponse::success(
        "Job retrieved successfully",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn accept_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.accept_job(job_id, &actor).await?;

    Ok(Json(ApiResponse::success(
        "Job accepted",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn start_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.start_job(job_id, &actor).await?;

    Ok(Json(ApiResponse::success(
        "Job started",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn complete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<CompleteJobDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .complete_job(job_id, &actor, minor_amount(body.final_price)?)
        .await?;

    Ok(Json(ApiResponse::success(
        "Job completed",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn cancel_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<CancelJobDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = optional_json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .cancel_job(job_id, &actor, body.reason)
        .await?;

    Ok(Json(ApiResponse::success(
        "Job cancelled",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn generate_invoice(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let invoice = app_state.job_service.generate_invoice(job_id, &actor).await?;

    Ok(Json(ApiResponse::success("Invoice generated", invoice)))
}
