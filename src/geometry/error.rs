use thiserror::Error;

use crate::admin_client::AdminProviderError;
use crate::directory::DirectoryError;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("durable directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("routes admin provider error: {0}")]
    AdminProvider(#[from] AdminProviderError),
    #[error("stored polyline could not be decoded: {0}")]
    Decode(String),
    #[error("geometry cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("geometry cache payload could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("geometry cache round trip exceeded its deadline")]
    Timeout,
}
