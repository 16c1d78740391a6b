//! Vehicle State Store (VSS): per-vehicle hot record persisted across
//! reports and query requests.
//!
//! `recordReport` performs the position update, timestamp stamp, and
//! speed-ring push/trim as a single server-evaluated Lua script against the
//! hot cache, so a concurrent `readState` for the same vehicle only ever
//! observes the full pre-update or full post-update record, never a mix
//! (§5).

mod error;

pub use error::VehicleStateError;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use redis::{AsyncCommands, Script};

use crate::cache::HotCache;

const RECORD_REPORT_SCRIPT: &str = r#"
local state_key = KEYS[1]
local speeds_key = KEYS[2]
local lat = ARGV[1]
local lng = ARGV[2]
local last_updated = ARGV[3]
local route_id = ARGV[4]
local push_speed = ARGV[5]
local speed = ARGV[6]
local ring_size = tonumber(ARGV[7])

redis.call('HSET', state_key, 'lastLat', lat, 'lastLng', lng, 'lastUpdated', last_updated, 'routeId', route_id)

if push_speed == '1' then
    redis.call('LPUSH', speeds_key, speed)
    redis.call('LTRIM', speeds_key, 0, ring_size - 1)
end

return redis.call('LRANGE', speeds_key, 0, ring_size - 1)
"#;

/// The hot, derived state for a single vehicle: its last reported position,
/// the bound route as echoed by the ingest resolver, and the bounded,
/// newest-first ring of recent raw speed samples.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleLiveState {
    pub lat: f64,
    pub lng: f64,
    pub last_updated: DateTime<Utc>,
    pub route_id: String,
    pub speed_ring: Vec<f64>,
}

impl VehicleLiveState {
    /// Arithmetic mean of the speed ring, rounded to one decimal. `0.0` when
    /// the ring is empty (§3).
    pub fn avg_speed_kmh(&self) -> f64 {
        if self.speed_ring.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.speed_ring.iter().sum();
        let mean = sum / self.speed_ring.len() as f64;
        (mean * 10.0).round() / 10.0
    }
}

fn state_key(vehicle_id: &str) -> String {
    format!("bus:{vehicle_id}")
}

fn speeds_key(vehicle_id: &str) -> String {
    format!("bus:{vehicle_id}:speeds")
}

#[derive(Clone)]
pub struct VehicleStateStore {
    cache: HotCache,
    ring_size: usize,
    request_timeout: Duration,
}

impl VehicleStateStore {
    pub fn new(cache: HotCache, ring_size: usize, request_timeout: Duration) -> Self {
        Self {
            cache,
            ring_size,
            request_timeout,
        }
    }

    /// Atomically updates the vehicle's position, timestamp and speed ring.
    ///
    /// A `speed` that is not finite and non-negative is omitted from the
    /// ring; `lat`, `lng` and `now` are still recorded (§4.2). Fails with
    /// [`VehicleStateError::Timeout`] if the round trip outlives the
    /// configured per-request deadline (§5).
    pub async fn record_report(
        &self,
        vehicle_id: &str,
        route_id: &str,
        lat: f64,
        lng: f64,
        speed: f64,
        now: DateTime<Utc>,
    ) -> Result<VehicleLiveState, VehicleStateError> {
        let push_speed = speed.is_finite() && speed >= 0.0;
        let mut conn = self.cache.clone();

        let speeds: Vec<f64> = tokio::time::timeout(
            self.request_timeout,
            Script::new(RECORD_REPORT_SCRIPT)
                .key(state_key(vehicle_id))
                .key(speeds_key(vehicle_id))
                .arg(lat)
                .arg(lng)
                .arg(now.to_rfc3339_opts(SecondsFormat::Millis, true))
                .arg(route_id)
                .arg(if push_speed { "1" } else { "0" })
                .arg(speed)
                .arg(self.ring_size as i64)
                .invoke_async(&mut conn),
        )
        .await
        .map_err(|_| VehicleStateError::Timeout)??;

        Ok(VehicleLiveState {
            lat,
            lng,
            last_updated: now,
            route_id: route_id.to_string(),
            speed_ring: speeds,
        })
    }

    /// Reads the current hot record for a vehicle. Returns `Ok(None)` when
    /// the vehicle has never reported (no ingest has reached the store).
    /// Fails with [`VehicleStateError::Timeout`] if either cache round trip
    /// outlives the configured per-request deadline (§5).
    pub async fn read_state(
        &self,
        vehicle_id: &str,
    ) -> Result<Option<VehicleLiveState>, VehicleStateError> {
        let mut conn = self.cache.clone();
        let fields: HashMap<String, String> = tokio::time::timeout(
            self.request_timeout,
            conn.hgetall(state_key(vehicle_id)),
        )
        .await
        .map_err(|_| VehicleStateError::Timeout)??;
        if fields.is_empty() {
            return Ok(None);
        }

        let parse_f64 = |name: &str| -> Result<f64, VehicleStateError> {
            fields
                .get(name)
                .ok_or_else(|| VehicleStateError::Corrupt(format!("missing field {name}")))?
                .parse()
                .map_err(|_| VehicleStateError::Corrupt(format!("field {name} is not a number")))
        };

        let lat = parse_f64("lastLat")?;
        let lng = parse_f64("lastLng")?;
        let last_updated = fields
            .get("lastUpdated")
            .ok_or_else(|| VehicleStateError::Corrupt("missing field lastUpdated".to_string()))?;
        let last_updated = DateTime::parse_from_rfc3339(last_updated)
            .map_err(|e| VehicleStateError::Corrupt(e.to_string()))?
            .with_timezone(&Utc);
        let route_id = fields
            .get("routeId")
            .ok_or_else(|| VehicleStateError::Corrupt("missing field routeId".to_string()))?
            .clone();

        let speed_ring: Vec<f64> = tokio::time::timeout(
            self.request_timeout,
            conn.lrange(speeds_key(vehicle_id), 0, self.ring_size as isize - 1),
        )
        .await
        .map_err(|_| VehicleStateError::Timeout)??;

        Ok(Some(VehicleLiveState {
            lat,
            lng,
            last_updated,
            route_id,
            speed_ring,
        }))
    }
}
