use axum::{extract::State, routing::get, Json, Router};
use redis::AsyncCommands;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::cache::HotCache;

#[derive(Clone)]
pub struct HealthState {
    pub pool: SqlitePool,
    pub cache: HotCache,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running at all.
    pub healthy: bool,
    /// Whether the durable directory (SQLite) answered a trivial query.
    pub directory_reachable: bool,
    /// Whether the hot cache (Redis) answered a PING.
    pub cache_reachable: bool,
}

/// Confirms the durable directory connection and hot-cache connection are
/// reachable. Ambient concern, not part of the tracking contract itself.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let directory_reachable = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    let mut conn = state.cache.clone();
    let cache_reachable: bool = conn.get::<_, Option<String>>("__health__").await.is_ok();

    Json(HealthResponse {
        healthy: true,
        directory_reachable,
        cache_reachable,
    })
}

pub fn router(pool: SqlitePool, cache: HotCache) -> Router {
    let state = HealthState { pool, cache };
    Router::new().route("/", get(health_check)).with_state(state)
}
