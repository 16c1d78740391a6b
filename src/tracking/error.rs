use thiserror::Error;

use crate::admin_client::AdminProviderError;
use crate::directory::DirectoryError;
use crate::geometry::GeometryError;
use crate::vehicle_state::VehicleStateError;

/// Unified error taxonomy for the tracking engine (§7): every variant maps to
/// exactly one HTTP status at the API boundary.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Malformed ingest payload: missing `vehicleId`, or non-finite coordinates.
    #[error("invalid location report: {0}")]
    Validation(String),

    /// Unknown `vehicleId`, or the vehicle's bound route does not exist.
    #[error("vehicle {0} is not known to the durable directory")]
    VehicleNotFound(String),

    /// The durable directory or hot cache is unreachable, or a request to
    /// the routes admin provider timed out or failed transiently.
    #[error("transient tracking store error: {0}")]
    Transient(String),

    /// A polyline could not be decoded, or some other internal invariant was
    /// violated. Surfaced to callers as a transient 5xx (§7).
    #[error("tracking invariant violated: {0}")]
    Invariant(String),
}

impl From<DirectoryError> for TrackingError {
    fn from(e: DirectoryError) -> Self {
        TrackingError::Transient(e.to_string())
    }
}

impl From<VehicleStateError> for TrackingError {
    fn from(e: VehicleStateError) -> Self {
        match e {
            VehicleStateError::Cache(_) | VehicleStateError::Timeout => {
                TrackingError::Transient(e.to_string())
            }
            VehicleStateError::Corrupt(_) => TrackingError::Invariant(e.to_string()),
        }
    }
}

impl From<GeometryError> for TrackingError {
    fn from(e: GeometryError) -> Self {
        match e {
            GeometryError::Decode(_) => TrackingError::Invariant(e.to_string()),
            GeometryError::Directory(inner) => inner.into(),
            GeometryError::AdminProvider(AdminProviderError::NotFound) => {
                TrackingError::Invariant(e.to_string())
            }
            GeometryError::AdminProvider(_)
            | GeometryError::Cache(_)
            | GeometryError::Serde(_)
            | GeometryError::Timeout => TrackingError::Transient(e.to_string()),
        }
    }
}
