use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::tracking::TrackingError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn internal_error(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Maps the tracking engine's error taxonomy onto HTTP status codes (§7):
/// `Validation` -> 400, `VehicleNotFound` -> 404, `Transient`/`Invariant` -> 5xx.
/// Logged at the point of failure in the tracking layer, not here, so the
/// originating store/key is never lost.
impl IntoResponse for TrackingError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TrackingError::Validation(msg) => {
                debug!(error = %msg, "rejected invalid request");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            TrackingError::VehicleNotFound(vehicle_id) => {
                debug!(vehicle_id, "vehicle not found");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            TrackingError::Transient(msg) => {
                warn!(error = %msg, "transient tracking store error");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            TrackingError::Invariant(msg) => {
                warn!(error = %msg, "tracking invariant violated");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
