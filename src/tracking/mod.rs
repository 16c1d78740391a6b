//! The tracking engine orchestrator: wires the Durable Directory, Geometry
//! Cache, Vehicle State Store, Map-Matcher, ETA Engine, Liveness Monitor and
//! Broadcaster into the two operations the API surface exposes —
//! `record_report` (ingest) and `live_query` (on-demand snapshot).
//!
//! Data flow on ingest: directory resolves vehicle→route → VSS update →
//! GC lookup → MM on vehicle and each stop → EE → LM → BR emit → response.
//! Data flow on live query: directory resolves route → VSS read → GC lookup
//! → MM + EE + LM → response (§2).

mod error;

pub use error::TrackingError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::broadcast::Broadcaster;
use crate::config::TrackingConfig;
use crate::directory::DurableDirectory;
use crate::eta::{self, StopOffset};
use crate::geometry::{GeometryCache, RouteGeometry};
use crate::liveness::{self, LiveStatus};
use crate::matcher;
use crate::vehicle_state::{VehicleLiveState, VehicleStateStore};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EtaStop {
    #[serde(rename = "stopId")]
    pub stop_id: String,
    pub name: String,
    #[serde(rename = "etaMinutes")]
    pub eta_minutes: i64,
}

/// The composite payload returned from ingest, from a live query, and pushed
/// over the WebSocket channel — byte-identical across all three (§8, property 6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VehicleUpdate {
    #[serde(rename = "busId")]
    pub vehicle_id: String,
    #[serde(rename = "routeId")]
    pub route_id: String,
    #[serde(rename = "snappedLocation")]
    pub snapped_location: Option<LatLng>,
    #[serde(rename = "avgSpeed")]
    pub avg_speed: f64,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(rename = "etaStops")]
    pub eta_stops: Vec<EtaStop>,
    pub status: &'static str,
}

#[derive(Clone)]
pub struct TrackingService {
    directory: DurableDirectory,
    geometry: GeometryCache,
    vehicle_state: VehicleStateStore,
    broadcaster: Broadcaster<VehicleUpdate>,
    config: TrackingConfig,
}

impl TrackingService {
    pub fn new(
        directory: DurableDirectory,
        geometry: GeometryCache,
        vehicle_state: VehicleStateStore,
        broadcaster: Broadcaster<VehicleUpdate>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            directory,
            geometry,
            vehicle_state,
            broadcaster,
            config,
        }
    }

    /// Subscribes the caller to every `bus:update` emitted for `route_id`.
    pub async fn subscribe(&self, route_id: &str) -> tokio::sync::broadcast::Receiver<VehicleUpdate> {
        self.broadcaster.join(route_id).await
    }

    /// Ingests a location report (§4's full ingest pipeline).
    pub async fn record_report(
        &self,
        vehicle_id: &str,
        lat: f64,
        lng: f64,
        speed: f64,
        now: DateTime<Utc>,
    ) -> Result<VehicleUpdate, TrackingError> {
        if vehicle_id.trim().is_empty() {
            return Err(TrackingError::Validation("busId is required".to_string()));
        }
        if !lat.is_finite() || !lng.is_finite() {
            debug!(vehicle_id, lat, lng, "rejected location report with non-finite coordinates");
            return Err(TrackingError::Validation(
                "lat and lng must be finite numbers".to_string(),
            ));
        }

        let Some(route_id) = self.directory.vehicle_route(vehicle_id).await? else {
            debug!(vehicle_id, "ingest rejected: vehicle not bound to a route");
            return Err(TrackingError::VehicleNotFound(vehicle_id.to_string()));
        };

        if self.directory.route_with_stops(&route_id).await?.is_none() {
            debug!(vehicle_id, route_id, "ingest rejected: bound route does not exist");
            return Err(TrackingError::VehicleNotFound(vehicle_id.to_string()));
        }

        let state = self
            .vehicle_state
            .record_report(vehicle_id, &route_id, lat, lng, speed, now)
            .await?;

        let geometry = self.load_geometry(&route_id).await;
        let update = self.build_update(vehicle_id, &route_id, &state, geometry.as_ref(), now);

        self.broadcaster.emit(&route_id, update.clone()).await;
        Ok(update)
    }

    /// Resolves the on-demand live snapshot for a vehicle (§4, live-query path).
    pub async fn live_query(
        &self,
        vehicle_id: &str,
        now: DateTime<Utc>,
    ) -> Result<VehicleUpdate, TrackingError> {
        let Some(route_id) = self.directory.vehicle_route(vehicle_id).await? else {
            return Err(TrackingError::VehicleNotFound(vehicle_id.to_string()));
        };

        let state = self.vehicle_state.read_state(vehicle_id).await?;

        let Some(state) = state else {
            return Ok(VehicleUpdate {
                vehicle_id: vehicle_id.to_string(),
                route_id,
                snapped_location: None,
                avg_speed: 0.0,
                last_updated: None,
                eta_stops: Vec::new(),
                status: LiveStatus::Offline.as_str(),
            });
        };

        let geometry = self.load_geometry(&route_id).await;
        Ok(self.build_update(vehicle_id, &route_id, &state, geometry.as_ref(), now))
    }

    /// Loads route geometry, degrading to `None` (rather than failing the
    /// caller) on any geometry-layer error, per §7: a geometry failure must
    /// not undo a VSS write that already succeeded.
    async fn load_geometry(&self, route_id: &str) -> Option<RouteGeometry> {
        match self.geometry.get_geometry(route_id).await {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!(route_id, error = %e, "geometry lookup failed, degrading to raw position");
                None
            }
        }
    }

    fn build_update(
        &self,
        vehicle_id: &str,
        route_id: &str,
        state: &VehicleLiveState,
        geometry: Option<&RouteGeometry>,
        now: DateTime<Utc>,
    ) -> VehicleUpdate {
        let status = liveness::classify(
            Some(state.last_updated),
            now,
            self.config.staleness_threshold_seconds,
        );
        let avg_speed = state.avg_speed_kmh();

        let (snapped_location, eta_stops) = match geometry {
            Some(geometry) if geometry.coords.len() >= 2 => {
                let matched = matcher::snap(&geometry.coords, (state.lng, state.lat));
                let stop_offsets: Vec<StopOffset> = geometry
                    .stops
                    .iter()
                    .zip(geometry.stop_offsets_km.iter())
                    .map(|(stop, offset_km)| StopOffset {
                        stop_id: stop.stop_id.clone(),
                        name: stop.name.clone(),
                        offset_km: *offset_km,
                    })
                    .collect();

                let etas = eta::compute_etas(
                    matched.offset_km,
                    &stop_offsets,
                    avg_speed,
                    self.config.min_speed_floor_kmh,
                );

                let location = LatLng {
                    lat: matched.snapped_lat,
                    lng: matched.snapped_lng,
                };
                let stops = etas
                    .into_iter()
                    .map(|e| EtaStop {
                        stop_id: e.stop_id,
                        name: e.name,
                        eta_minutes: e.eta_minutes,
                    })
                    .collect();
                (Some(location), stops)
            }
            _ => (
                Some(LatLng {
                    lat: state.lat,
                    lng: state.lng,
                }),
                Vec::new(),
            ),
        };

        VehicleUpdate {
            vehicle_id: vehicle_id.to_string(),
            route_id: route_id.to_string(),
            snapped_location,
            avg_speed,
            last_updated: Some(state.last_updated),
            eta_stops,
            status: status.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_update_serializes_to_wire_shape() {
        let update = VehicleUpdate {
            vehicle_id: "V1".to_string(),
            route_id: "R1".to_string(),
            snapped_location: Some(LatLng { lat: 28.63, lng: 77.29 }),
            avg_speed: 40.0,
            last_updated: Some(
                DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            ),
            eta_stops: vec![EtaStop {
                stop_id: "S1".to_string(),
                name: "Connaught Place".to_string(),
                eta_minutes: 0,
            }],
            status: "online",
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["busId"], "V1");
        assert_eq!(json["routeId"], "R1");
        assert_eq!(json["snappedLocation"]["lat"], 28.63);
        assert_eq!(json["avgSpeed"], 40.0);
        assert_eq!(json["etaStops"][0]["etaMinutes"], 0);
        assert_eq!(json["status"], "online");
    }

    #[test]
    fn query_with_no_report_serializes_null_fields() {
        let update = VehicleUpdate {
            vehicle_id: "V1".to_string(),
            route_id: "R1".to_string(),
            snapped_location: None,
            avg_speed: 0.0,
            last_updated: None,
            eta_stops: Vec::new(),
            status: "offline",
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json["snappedLocation"].is_null());
        assert!(json["lastUpdated"].is_null());
        assert_eq!(json["etaStops"].as_array().unwrap().len(), 0);
    }
}
