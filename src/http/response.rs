//! Response bodies and error mapping.
//!
//! # Responsibilities
//! - Define the JSON bodies returned by the relay endpoints
//! - Map relay errors to HTTP status codes
//!
//! # Design Decisions
//! - Every error body has the shape `{"status": "error", "message": ...}`
//! - Tracker conflicts are internal errors; only unknown ids are 404

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::http::request::RequestError;
use crate::relay::{Acceptance, TrackerError};

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] RequestError),

    #[error("Request not found")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body for every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            status: "error".to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// 202 body for an accepted add/reject request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedBody {
    pub status: String,
    pub request_id: Uuid,
    pub message: String,
    pub domain: String,
}

impl From<Acceptance> for AcceptedBody {
    fn from(acceptance: Acceptance) -> Self {
        Self {
            status: "accepted".to_string(),
            request_id: acceptance.request_id,
            message: "Request received and processing started".to_string(),
            domain: acceptance.domain,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(RequestError::MissingBody).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TrackerError::NotFound(Uuid::nil())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TrackerError::AlreadyExists(Uuid::nil())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = ApiError::from(RequestError::MissingField("domain"));
        assert_eq!(err.to_string(), "Missing required field: domain");
    }

    #[test]
    fn test_accepted_body() {
        let id = Uuid::new_v4();
        let body = AcceptedBody::from(Acceptance {
            request_id: id,
            domain: "a.com".into(),
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], "accepted");
        assert_eq!(value["request_id"], id.to_string());
        assert_eq!(value["domain"], "a.com");
        assert_eq!(value["message"], "Request received and processing started");
    }
}
