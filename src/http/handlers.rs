//! Endpoint handlers.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::http::request::parse_relay_request;
use crate::http::response::{AcceptedBody, ApiError, HealthBody};
use crate::http::server::AppState;
use crate::relay::{CertOperation, RequestRecord};

/// `POST /api/v1.0/cert/add`
pub async fn cert_add(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AcceptedBody>), ApiError> {
    accept(&state, CertOperation::Add, &body)
}

/// `POST /api/v1.0/cert/reject`
pub async fn cert_reject(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AcceptedBody>), ApiError> {
    accept(&state, CertOperation::Reject, &body)
}

fn accept(
    state: &AppState,
    action: CertOperation,
    body: &[u8],
) -> Result<(StatusCode, Json<AcceptedBody>), ApiError> {
    let request = parse_relay_request(body).map_err(|e| {
        tracing::warn!(action = %action, error = %e, "Rejected invalid relay request");
        e
    })?;
    let acceptance = state.relay.accept(action, request)?;
    Ok((StatusCode::ACCEPTED, Json(acceptance.into())))
}

/// `GET /status/{request_id}`
pub async fn get_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestRecord>, ApiError> {
    // Ids that are not UUIDs were never issued.
    let id = Uuid::parse_str(&request_id).map_err(|_| ApiError::NotFound)?;
    Ok(Json(state.relay.tracker().get(id)?))
}

/// `GET /health`
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy".to_string(),
    })
}
