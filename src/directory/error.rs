use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("durable directory query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("durable directory query exceeded its deadline")]
    Timeout,
}
