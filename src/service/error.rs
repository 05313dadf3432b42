use thiserror::Error;
use uuid::Uuid;
use crate::{
    db::jobdb::StoreError,
    error::HttpError,
    models::jobmodel::*,
    service::payment_gateway::GatewayError,
};
use axum::http::StatusCode;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("User {0} is not authorized to perform this action on job {1}")]
    UnauthorizedJobAccess(Uuid, Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidStateTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id} is {status}; this operation requires a completed job")]
    JobNotCompleted { job_id: Uuid, status: JobStatus },

    #[error("Job {0} is cancelled and no longer accepts payments")]
    JobCancelled(Uuid),

    #[error("Payment is {status}: {reason}")]
    InvalidPaymentState {
        status: PaymentStatus,
        reason: String,
    },

    #[error("Job {0} was modified concurrently; reload and retry")]
    StateConflict(Uuid),

    #[error("Payment signature does not match")]
    SignatureMismatch,

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("A payment dispute is open; confirmation is locked until it is resolved")]
    DisputeOpen,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Stable error kind reported to clients.
    pub fn error_kind(&self) -> &'static str {
        match self {
            ServiceError::JobNotFound(_) => "NotFound",
            ServiceError::UnauthorizedJobAccess(_, _) => "Forbidden",
            ServiceError::Validation(_) => "ValidationError",
            ServiceError::InvalidStateTransition { .. }
            | ServiceError::JobNotCompleted { .. }
            | ServiceError::JobCancelled(_)
            | ServiceError::InvalidPaymentState { .. } => "InvalidStateTransition",
            ServiceError::StateConflict(_) => "StateConflict",
            ServiceError::SignatureMismatch => "SignatureMismatch",
            ServiceError::GatewayUnavailable(_) => "GatewayUnavailable",
            ServiceError::DisputeOpen => "DisputeOpen",
            ServiceError::Storage(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::JobNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::UnauthorizedJobAccess(_, _) => StatusCode::FORBIDDEN,

            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::InvalidStateTransition { .. }
            | ServiceError::JobNotCompleted { .. }
            | ServiceError::JobCancelled(_)
            | ServiceError::InvalidPaymentState { .. }
            | ServiceError::StateConflict(_)
            | ServiceError::DisputeOpen => StatusCode::CONFLICT,

            ServiceError::SignatureMismatch => StatusCode::UNPROCESSABLE_ENTITY,

            ServiceError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        HttpError::new(error.to_string(), error.status_code(), error.error_kind())
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(job_id) => ServiceError::StateConflict(job_id),
            StoreError::NotFound(job_id) => ServiceError::JobNotFound(job_id),
            StoreError::Database(e) => ServiceError::Storage(e.to_string()),
            StoreError::Serialization(e) => ServiceError::Storage(e.to_string()),
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(error: GatewayError) -> Self {
        ServiceError::GatewayUnavailable(error.to_string())
    }
}
