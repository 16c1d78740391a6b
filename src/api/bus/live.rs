use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;

use super::BusState;
use crate::tracking::{TrackingError, VehicleUpdate};

/// On-demand live snapshot for a single vehicle. `snappedLocation` is `null`
/// if the vehicle has never reported; `status` reflects §4.5's staleness rule.
#[utoipa::path(
    get,
    path = "/api/bus/{id}/live",
    params(("id" = String, Path, description = "vehicleId")),
    responses(
        (status = 200, description = "Live snapshot", body = VehicleUpdate),
        (status = 404, description = "Unknown busId", body = crate::api::ErrorResponse)
    ),
    tag = "bus"
)]
pub async fn live(
    State(state): State<BusState>,
    Path(id): Path<String>,
) -> Result<Json<VehicleUpdate>, TrackingError> {
    let update = state.tracking.live_query(&id, Utc::now()).await?;
    Ok(Json(update))
}
