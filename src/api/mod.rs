pub mod bus;
pub mod error;
pub mod health;

pub use error::ErrorResponse;

use axum::Router;
use sqlx::SqlitePool;

use crate::cache::HotCache;
use crate::tracking::TrackingService;

/// Mounts the tracking engine's HTTP surface (§6.1) under `/api`: vehicle
/// ingest and live-query under `/bus`, the push channel at `/bus/ws`, and the
/// ambient health check at `/health`.
pub fn router(tracking: TrackingService, pool: SqlitePool, cache: HotCache) -> Router {
    Router::new()
        .nest("/bus", bus::router(tracking))
        .nest("/health", health::router(pool, cache))
}
