use serde::Deserialize;
use std::path::Path;

/// Top-level service configuration, loaded once at startup from a YAML file.
///
/// Every tunable carries a default so a near-empty config file is valid; see
/// the individual `default_*` functions below for the values mandated by the
/// tracking contract.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP bind address, e.g. "0.0.0.0:3000".
    #[serde(default = "Config::default_bind_addr")]
    pub bind_addr: String,

    /// SQLite connection URL for the durable directory (routes/stops/vehicles mirror).
    #[serde(default = "Config::default_database_url")]
    pub database_url: String,

    /// Redis URL backing the Geometry Cache and Vehicle State Store.
    #[serde(default = "Config::default_redis_url")]
    pub redis_url: String,

    /// Base URL of the admin service's read-only routes-with-polyline endpoint.
    #[serde(default = "Config::default_routes_admin_base_url")]
    pub routes_admin_base_url: String,

    /// Per-request timeout, in milliseconds, for calls to the Routes Admin Provider
    /// and for the durable-directory round trip that backs a single ingest/query.
    #[serde(default = "Config::default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Allowed CORS origins. Required unless `cors_permissive` is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,

    /// Tracking-engine tunables (§4.2, §4.4, §4.5 of the contract).
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Tunables that govern the live-tracking engine's behavior.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TrackingConfig {
    /// Maximum age, in seconds, of a vehicle's last report before it is
    /// considered offline. Default 90.
    #[serde(default = "TrackingConfig::default_staleness_threshold_seconds")]
    pub staleness_threshold_seconds: i64,
    /// Number of raw speed samples retained per vehicle, newest-first. Default 3.
    #[serde(default = "TrackingConfig::default_speed_ring_size")]
    pub speed_ring_size: usize,
    /// Floor applied to the smoothed speed before computing ETAs, in km/h. Default 1.0.
    #[serde(default = "TrackingConfig::default_min_speed_floor_kmh")]
    pub min_speed_floor_kmh: f64,
    /// Optional TTL, in seconds, applied to Geometry Cache entries. `None` means
    /// entries live until explicitly invalidated.
    #[serde(default)]
    pub geometry_cache_ttl_seconds: Option<u64>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_seconds: Self::default_staleness_threshold_seconds(),
            speed_ring_size: Self::default_speed_ring_size(),
            min_speed_floor_kmh: Self::default_min_speed_floor_kmh(),
            geometry_cache_ttl_seconds: None,
        }
    }
}

impl TrackingConfig {
    fn default_staleness_threshold_seconds() -> i64 {
        90
    }
    fn default_speed_ring_size() -> usize {
        3
    }
    fn default_min_speed_floor_kmh() -> f64 {
        1.0
    }
}

impl Config {
    fn default_bind_addr() -> String {
        "0.0.0.0:3000".to_string()
    }
    fn default_database_url() -> String {
        "sqlite://database/data.db?mode=rwc".to_string()
    }
    fn default_redis_url() -> String {
        "redis://127.0.0.1:6379".to_string()
    }
    fn default_routes_admin_base_url() -> String {
        "http://localhost:4000".to_string()
    }
    fn default_request_timeout_ms() -> u64 {
        2_000
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
