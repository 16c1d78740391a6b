pub mod ingest;
pub mod live;
pub mod ws;

pub use ingest::{IngestResponse, LocationReportRequest};
pub use ws::bus_ws;

use axum::routing::{get, post};
use axum::Router;

use crate::tracking::TrackingService;

#[derive(Clone)]
pub struct BusState {
    pub tracking: TrackingService,
}

pub fn router(tracking: TrackingService) -> Router {
    let state = BusState { tracking };
    Router::new()
        .route("/update-location", post(ingest::update_location))
        .route("/{id}/live", get(live::live))
        .route("/ws", get(ws::bus_ws))
        .with_state(state)
}
