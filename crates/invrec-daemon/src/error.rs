//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use invrec_engine::EngineError;
use invrec_records::RecordError;
use invrec_template::TemplateError;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::api_types::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body is empty")]
    EmptyUpload,

    #[error("file is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("file is not UTF-8 text")]
    NotUtf8,

    /// Input rejected by the record, template or engine validation.
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::EmptyUpload | ApiError::NotUtf8 | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::EmptyUpload => "EMPTY_UPLOAD",
            ApiError::TooLarge { .. } => "FILE_TOO_LARGE",
            ApiError::NotUtf8 => "NOT_UTF8",
            ApiError::Invalid(_) => "VALIDATION_FAILED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "SESSION_NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(e: RecordError) -> Self {
        if e.is_validation() {
            ApiError::Invalid(e.to_string())
        } else {
            ApiError::Internal(e.into())
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        if e.is_validation() {
            ApiError::Invalid(e.to_string())
        } else {
            ApiError::Internal(e.into())
        }
    }
}

impl From<TemplateError> for ApiError {
    fn from(e: TemplateError) -> Self {
        match e {
            TemplateError::Engine(inner) => inner.into(),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.code().to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
