use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(rename = "errorKind")]
    pub error_kind: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(&self).map_err(|_| fmt::Error)?)
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    ActorNotProvided,
    InvalidActorId,
    InvalidActorRole,
}

impl ToString for ErrorMessage {
    fn to_string(&self) -> String {
        self.to_str().to_owned()
    }
}

impl ErrorMessage {
    fn to_str(&self) -> String {
        match self {
            ErrorMessage::ActorNotProvided => "Caller identity was not provided".to_string(),
            ErrorMessage::InvalidActorId => "X-Actor-Id must be a valid UUID".to_string(),
            ErrorMessage::InvalidActorRole => "X-Actor-Role must be 'customer' or 'professional'".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    pub kind: &'static str,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode, kind: &'static str) -> Self {
        HttpError {
            message: message.into(),
            status,
            kind,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST, "ValidationError")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            success: false,
            error_kind: self.kind.to_string(),
            message: self.message.clone(),
        });

        (self.status, json_response).into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}, kind: {}",
            self.message, self.status, self.kind
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}
