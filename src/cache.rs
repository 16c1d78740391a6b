//! Shared hot-cache plumbing for the Geometry Cache and Vehicle State Store.
//!
//! Both stores reach Redis through a single injected [`redis::aio::ConnectionManager`]
//! so call sites never see reconnect logic; the manager transparently
//! reconnects on connection loss.

use redis::aio::ConnectionManager;

pub type HotCache = ConnectionManager;

pub async fn connect(redis_url: &str) -> Result<HotCache, redis::RedisError> {
    let client = redis::Client::open(redis_url)?;
    client.get_connection_manager().await
}
