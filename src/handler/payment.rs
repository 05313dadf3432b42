// handler/payment.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::jobdtos::*,
    error::HttpError,
    handler::{json_body, minor_amount, optional_json_body},
    models::jobmodel::Actor,
    service::job_service::OnlineOrder,
    AppState,
};

pub fn payment_handler() -> Router {
    Router::new()
        .route("/online/order", post(create_online_order))
        .route("/online/verify", post(verify_online_payment))
        .route("/online/manual-confirm", post(confirm_manual_payment))
        .route("/cash/received", post(mark_cash_received))
        .route("/cash/confirm", post(confirm_cash_payment))
        .route("/cash/dispute", post(raise_dispute))
        .route("/cash/receipts", post(attach_receipt_photo))
}

pub async fn create_online_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<CreateOnlineOrderDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let order = app_state
        .job_service
        .create_online_order(job_id, &actor, minor_amount(body.amount)?)
        .await?;

    let message = match order {
        OnlineOrder::Gateway { .. } => "Payment order created",
        OnlineOrder::ManualFallback { .. } => {
            "Payment gateway unavailable. Pay using the manual payment link and confirm once done"
        }
    };

    Ok(Json(ApiResponse::success(message, order)))
}

pub async fn verify_online_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<VerifyOnlinePaymentDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .verify_online_payment(job_id, &actor, &body.order_id, &body.payment_id, &body.signature)
        .await?;

    Ok(Json(ApiResponse::success(
        "Payment verified",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn confirm_manual_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .confirm_manual_payment(job_id, &actor)
        .await?;

    Ok(Json(ApiResponse::success(
        "Manual payment recorded and awaiting reconciliation",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn mark_cash_received(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<MarkCashReceivedDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .mark_cash_received(job_id, &actor, minor_amount(body.amount)?, &body.method)
        .await?;

    Ok(Json(ApiResponse::success(
        "Cash marked as received. Waiting for the customer to confirm",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn confirm_cash_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<ConfirmCashPaymentDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = optional_json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .confirm_cash_payment(job_id, &actor, body.verification_code.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(
        "Cash payment confirmed",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn raise_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<RaiseDisputeDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .raise_dispute(job_id, &actor, &body.reason)
        .await?;

    Ok(Json(ApiResponse::success(
        "Dispute raised. Support will review the payment",
        JobResponseDto::for_viewer(job, &actor),
    )))
}

pub async fn attach_receipt_photo(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(job_id): Path<Uuid>,
    body: Result<Json<ReceiptPhotoDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let body = json_body(body)?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .attach_receipt_photo(job_id, &actor, &body.photo_url)
        .await?;

    Ok(Json(ApiResponse::success(
        "Receipt photo attached",
        JobResponseDto::for_viewer(job, &actor),
    )))
}
