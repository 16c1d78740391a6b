use thiserror::Error;

#[derive(Debug, Error)]
pub enum VehicleStateError {
    #[error("vehicle state cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("vehicle state record is corrupt: {0}")]
    Corrupt(String),
    #[error("vehicle state cache round trip exceeded its deadline")]
    Timeout,
}
