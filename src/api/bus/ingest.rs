use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::BusState;
use crate::tracking::{TrackingError, VehicleUpdate};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationReportRequest {
    #[serde(rename = "busId")]
    pub bus_id: String,
    pub lat: f64,
    pub lng: f64,
    pub speed: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub success: bool,
    #[serde(flatten)]
    pub update: VehicleUpdate,
}

/// Vehicle ingest: records a location report and returns the recomputed
/// tracking snapshot for the vehicle.
#[utoipa::path(
    post,
    path = "/api/bus/update-location",
    request_body = LocationReportRequest,
    responses(
        (status = 200, description = "Report accepted", body = IngestResponse),
        (status = 400, description = "Malformed report", body = crate::api::ErrorResponse),
        (status = 404, description = "Unknown busId", body = crate::api::ErrorResponse),
        (status = 503, description = "Transient store error", body = crate::api::ErrorResponse)
    ),
    tag = "bus"
)]
pub async fn update_location(
    State(state): State<BusState>,
    Json(request): Json<LocationReportRequest>,
) -> Result<Json<IngestResponse>, TrackingError> {
    let update = state
        .tracking
        .record_report(&request.bus_id, request.lat, request.lng, request.speed, Utc::now())
        .await?;

    Ok(Json(IngestResponse {
        success: true,
        update,
    }))
}
