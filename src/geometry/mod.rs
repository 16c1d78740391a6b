//! Geometry Cache (GC): supplies, for a given `routeId`, the decoded polyline
//! (ordered (lng, lat) points) and the ordered stop list.
//!
//! On a hot-cache hit the stored geometry is returned verbatim. On a miss,
//! the Durable Directory resolves the Route and its Stops, the Routes Admin
//! Provider fetches the route's encoded polyline, and the decoded result is
//! written back to the cache best-effort (§4.1: a cache write failure must
//! not fail the caller, which already has the computed geometry in hand).

mod error;
mod polyline_codec;

pub use error::GeometryError;
pub use polyline_codec::{decode_precision5, encode_precision5};

use std::collections::HashMap;
use std::time::Duration;

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::admin_client::{AdminProviderError, RoutesAdminProvider};
use crate::cache::HotCache;
use crate::directory::DurableDirectory;
use crate::matcher;

#[derive(Debug, Clone, PartialEq)]
pub struct StopGeometry {
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// The decoded geometry for a route: its polyline and ordered stops, with
/// per-stop arc offsets precomputed since they never change for the life of
/// the route (§4.1, §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    pub coords: Vec<(f64, f64)>,
    pub stops: Vec<StopGeometry>,
    pub stop_offsets_km: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct CachedStop {
    #[serde(rename = "stopId")]
    stop_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
}

fn cache_key(route_id: &str) -> String {
    format!("route:{route_id}")
}

#[derive(Clone)]
pub struct GeometryCache {
    cache: HotCache,
    directory: DurableDirectory,
    admin: RoutesAdminProvider,
    ttl_seconds: Option<u64>,
    request_timeout: Duration,
}

impl GeometryCache {
    pub fn new(
        cache: HotCache,
        directory: DurableDirectory,
        admin: RoutesAdminProvider,
        ttl_seconds: Option<u64>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            directory,
            admin,
            ttl_seconds,
            request_timeout,
        }
    }

    /// Returns `Ok(None)` when the route is unknown to the durable directory,
    /// or when the admin provider has no polyline for it yet (§4.1: both
    /// collapse to `notFound`).
    pub async fn get_geometry(&self, route_id: &str) -> Result<Option<RouteGeometry>, GeometryError> {
        if let Some(geometry) = self.read_cache(route_id).await? {
            return Ok(Some(geometry));
        }

        let Some(route) = self.directory.route_with_stops(route_id).await? else {
            return Ok(None);
        };

        let polyline = match self.admin.fetch_polyline(&route.route_name).await {
            Ok(Some(p)) => p,
            Ok(None) => return Ok(None),
            Err(AdminProviderError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let coords = decode_precision5(&polyline.geometry).map_err(GeometryError::Decode)?;
        if coords.len() < 2 {
            return Ok(None);
        }

        let stops: Vec<StopGeometry> = route
            .stops
            .into_iter()
            .map(|s| StopGeometry {
                stop_id: s.stop_id,
                name: s.name,
                lat: s.lat,
                lng: s.lng,
            })
            .collect();

        let stop_offsets_km: Vec<f64> = stops
            .iter()
            .map(|s| matcher::snap(&coords, (s.lng, s.lat)).offset_km)
            .collect();

        let geometry = RouteGeometry {
            coords,
            stops,
            stop_offsets_km,
        };

        if let Err(e) = self.write_cache(route_id, &geometry).await {
            warn!(route_id, error = %e, "best-effort geometry cache write failed");
        }

        Ok(Some(geometry))
    }

    /// Removes the cache entry for a route, e.g. after an admin action
    /// replaces its polyline.
    pub async fn invalidate(&self, route_id: &str) -> Result<(), GeometryError> {
        let mut conn = self.cache.clone();
        tokio::time::timeout(self.request_timeout, conn.del::<_, ()>(cache_key(route_id)))
            .await
            .map_err(|_| GeometryError::Timeout)??;
        Ok(())
    }

    async fn read_cache(&self, route_id: &str) -> Result<Option<RouteGeometry>, GeometryError> {
        let mut conn = self.cache.clone();
        let fields: HashMap<String, String> = tokio::time::timeout(
            self.request_timeout,
            conn.hgetall(cache_key(route_id)),
        )
        .await
        .map_err(|_| GeometryError::Timeout)??;

        let (Some(poly_json), Some(stops_json)) = (fields.get("polyline"), fields.get("stops")) else {
            return Ok(None);
        };

        let coords: Vec<(f64, f64)> = serde_json::from_str(poly_json)?;
        let cached_stops: Vec<CachedStop> = serde_json::from_str(stops_json)?;
        let stop_offsets_km: Vec<f64> = match fields.get("stopOffsetsKm") {
            Some(s) => serde_json::from_str(s)?,
            None => cached_stops
                .iter()
                .map(|s| matcher::snap(&coords, (s.longitude, s.latitude)).offset_km)
                .collect(),
        };

        let stops = cached_stops
            .into_iter()
            .map(|s| StopGeometry {
                stop_id: s.stop_id,
                name: s.name,
                lat: s.latitude,
                lng: s.longitude,
            })
            .collect();

        Ok(Some(RouteGeometry {
            coords,
            stops,
            stop_offsets_km,
        }))
    }

    async fn write_cache(&self, route_id: &str, geometry: &RouteGeometry) -> Result<(), GeometryError> {
        let poly_json = serde_json::to_string(&geometry.coords)?;
        let cached_stops: Vec<CachedStop> = geometry
            .stops
            .iter()
            .map(|s| CachedStop {
                stop_id: s.stop_id.clone(),
                name: s.name.clone(),
                latitude: s.lat,
                longitude: s.lng,
            })
            .collect();
        let stops_json = serde_json::to_string(&cached_stops)?;
        let offsets_json = serde_json::to_string(&geometry.stop_offsets_km)?;

        let mut conn = self.cache.clone();
        let key = cache_key(route_id);
        let _: () = tokio::time::timeout(
            self.request_timeout,
            conn.hset_multiple(
                &key,
                &[
                    ("polyline", poly_json),
                    ("stops", stops_json),
                    ("stopOffsetsKm", offsets_json),
                ],
            ),
        )
        .await
        .map_err(|_| GeometryError::Timeout)??;

        if let Some(ttl) = self.ttl_seconds {
            let _: () = tokio::time::timeout(self.request_timeout, conn.expire(&key, ttl as i64))
                .await
                .map_err(|_| GeometryError::Timeout)??;
        }

        Ok(())
    }
}
