//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use dental_clinic_core::{ClinicError, FieldError};

/// Body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing fields")]
    MissingFields,

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ClinicError> for ApiError {
    fn from(e: ClinicError) -> Self {
        match e {
            ClinicError::MissingFields => ApiError::MissingFields,
            ClinicError::Validation(errors) => ApiError::Validation(errors.errors),
            ClinicError::Unauthorized => ApiError::Unauthorized,
            ClinicError::NotFound(what) => ApiError::NotFound(what),
            e @ (ClinicError::EmailAlreadyExists | ClinicError::VersionConflict { .. }) => {
                ApiError::Conflict(e.to_string())
            }
            e @ (ClinicError::Database(_) | ClinicError::Internal(_)) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field_errors) = match &self {
            ApiError::MissingFields | ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, Vec::new()),
            ApiError::Validation(fields) => (StatusCode::BAD_REQUEST, fields.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, Vec::new()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, Vec::new()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, Vec::new()),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "Internal error");
                let body = ErrorBody {
                    error: "Internal server error".to_string(),
                    field_errors: Vec::new(),
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
            field_errors,
        };
        (status, Json(body)).into_response()
    }
}
