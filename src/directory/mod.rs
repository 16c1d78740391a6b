//! Durable Directory: this crate's read-only local mirror of the admin
//! service's Route/Stop/Vehicle records.
//!
//! In a full deployment these tables are populated and owned by the admin
//! service; this crate only ever reads them. The one durable fact the core
//! does *not* mirror here is the Polyline, which is fetched on demand from
//! the Routes Admin Provider (see [`crate::admin_client`]).

mod error;

pub use error::DirectoryError;

use std::time::Duration;

use sqlx::{FromRow, SqlitePool};

/// A Route and its ordered Stops, as resolved from the durable directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteWithStops {
    pub route_id: String,
    pub route_name: String,
    pub stops: Vec<StopRecord>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StopRecord {
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
struct RouteRow {
    route_id: String,
    route_name: String,
}

/// Read-only access to the durable directory's `routes`, `stops` and
/// `vehicles` tables.
/// Read-only access to the durable directory's `routes`, `stops` and
/// `vehicles` tables.
#[derive(Clone)]
pub struct DurableDirectory {
    pool: SqlitePool,
    request_timeout: Duration,
}

impl DurableDirectory {
    pub fn new(pool: SqlitePool, request_timeout: Duration) -> Self {
        Self {
            pool,
            request_timeout,
        }
    }

    /// Resolves the `routeId` a vehicle is currently bound to.
    ///
    /// Returns `Ok(None)` when the vehicle is unknown (§3: a `LocationReport`
    /// is only accepted for a known Vehicle). Fails with
    /// [`DirectoryError::Timeout`] if the query outlives the configured
    /// per-request deadline (§5).
    pub async fn vehicle_route(&self, vehicle_id: &str) -> Result<Option<String>, DirectoryError> {
        let row: Option<(String,)> = tokio::time::timeout(
            self.request_timeout,
            sqlx::query_as("SELECT route_id FROM vehicles WHERE vehicle_id = ?")
                .bind(vehicle_id)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(|_| DirectoryError::Timeout)??;
        Ok(row.map(|(route_id,)| route_id))
    }

    /// Resolves a Route and its ordered Stops by `routeId`.
    ///
    /// Returns `Ok(None)` when no such route exists in the directory. Fails
    /// with [`DirectoryError::Timeout`] if either query outlives the
    /// configured per-request deadline (§5).
    pub async fn route_with_stops(
        &self,
        route_id: &str,
    ) -> Result<Option<RouteWithStops>, DirectoryError> {
        let route: Option<RouteRow> = tokio::time::timeout(
            self.request_timeout,
            sqlx::query_as("SELECT route_id, route_name FROM routes WHERE route_id = ?")
                .bind(route_id)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(|_| DirectoryError::Timeout)??;

        let Some(route) = route else {
            return Ok(None);
        };

        let stops: Vec<StopRecord> = tokio::time::timeout(
            self.request_timeout,
            sqlx::query_as(
                "SELECT stop_id, name, lat, lng FROM stops WHERE route_id = ? ORDER BY sequence ASC",
            )
            .bind(route_id)
            .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| DirectoryError::Timeout)??;

        Ok(Some(RouteWithStops {
            route_id: route.route_id,
            route_name: route.route_name,
            stops,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        sqlx::query("INSERT INTO routes (route_id, route_name) VALUES (?, ?)")
            .bind("R1")
            .bind("Connaught Place Express")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO stops (route_id, sequence, stop_id, name, lat, lng) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind("R1")
        .bind(0)
        .bind("S1")
        .bind("Connaught Place")
        .bind(28.6328)
        .bind(77.2197)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO stops (route_id, sequence, stop_id, name, lat, lng) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind("R1")
        .bind(1)
        .bind("S2")
        .bind("Terminus")
        .bind(28.628)
        .bind(77.3649)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO vehicles (vehicle_id, route_id) VALUES (?, ?)")
            .bind("V1")
            .bind("R1")
            .execute(&pool)
            .await
            .unwrap();

        pool
    }

    fn test_timeout() -> Duration {
        Duration::from_secs(5)
    }

    #[tokio::test]
    async fn resolves_vehicle_route_binding() {
        let pool = seeded_pool().await;
        let dir = DurableDirectory::new(pool, test_timeout());
        assert_eq!(dir.vehicle_route("V1").await.unwrap(), Some("R1".to_string()));
        assert_eq!(dir.vehicle_route("UNKNOWN").await.unwrap(), None);
    }

    #[tokio::test]
    async fn resolves_route_with_ordered_stops() {
        let pool = seeded_pool().await;
        let dir = DurableDirectory::new(pool, test_timeout());
        let route = dir.route_with_stops("R1").await.unwrap().unwrap();
        assert_eq!(route.route_name, "Connaught Place Express");
        assert_eq!(route.stops.len(), 2);
        assert_eq!(route.stops[0].stop_id, "S1");
        assert_eq!(route.stops[1].stop_id, "S2");
    }

    #[tokio::test]
    async fn missing_route_is_none() {
        let pool = seeded_pool().await;
        let dir = DurableDirectory::new(pool, test_timeout());
        assert_eq!(dir.route_with_stops("NOPE").await.unwrap(), None);
    }
}
