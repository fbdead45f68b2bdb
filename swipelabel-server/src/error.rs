use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use swipelabel_core::{ErrorBody, ErrorCode, RequestError};
use thiserror::Error;

/// Failure of a review API operation, rendered as a JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("You have already reviewed this image")]
    DuplicateReview,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Store or signer failure. Carries only the public message; the cause is
    /// logged where the error is raised.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details,
        }
    }

    /// Convert a validation failure, using `missing_message` when fields are absent.
    pub fn invalid_request(missing_message: &str, err: RequestError) -> Self {
        let message = err.to_string();
        match err {
            RequestError::MissingFields(presence) => {
                Self::bad_request(missing_message, Some(json!(presence)))
            }
            RequestError::InvalidScore(invalid) => Self::bad_request(
                message,
                Some(json!({ "review_score": invalid.0, "allowed": [0, 1] })),
            ),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::DuplicateReview => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadRequest { .. } => ErrorCode::BadRequest,
            Self::InvalidCredentials => ErrorCode::InvalidCredentials,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::DuplicateReview => ErrorCode::DuplicateReview,
            Self::MethodNotAllowed => ErrorCode::MethodNotAllowed,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            Self::BadRequest { details, .. } => details.clone(),
            Self::InvalidCredentials => Some(json!("No matching user found")),
            _ => None,
        };

        ErrorBody {
            error: self.to_string(),
            code: self.code(),
            details,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(
            "Malformed request body",
            Some(json!(rejection.body_text())),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("Malformed query string", Some(json!(rejection.body_text())))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
