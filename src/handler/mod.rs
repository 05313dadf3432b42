pub mod job;
pub mod payment;

use axum::{extract::rejection::JsonRejection, Json};

use crate::{error::HttpError, utils::currency::to_minor_units};

/// Unwrap a JSON body, reporting malformed input in the error envelope.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, HttpError> {
    body.map(|Json(body)| body)
        .map_err(|e| HttpError::bad_request(e.body_text()))
}

/// Like `json_body`, but a request that sends no JSON at all gets the
/// default body.
pub fn optional_json_body<T: Default>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, HttpError> {
    match body {
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        body => json_body(body),
    }
}

pub fn minor_amount(amount: f64) -> Result<i64, HttpError> {
    to_minor_units(amount).ok_or_else(|| HttpError::bad_request("Amount is out of range"))
}
