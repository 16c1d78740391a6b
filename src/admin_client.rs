//! Routes Admin Provider: the HTTP client this crate uses to fetch a route's
//! encoded polyline from the external admin service.
//!
//! The admin service owns polyline synthesis (an external one-shot action,
//! §1); this crate only ever reads the already-computed artifact through the
//! read-only `GET /api/routes-with-polyline` contract (§6.1).

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct RoutePolylineResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "routeName")]
    pub route_name: String,
    /// Encoded polyline string, precision-5 Google encoding.
    pub geometry: String,
    pub distance: f64,
    pub duration: f64,
}

#[derive(Debug, Error)]
pub enum AdminProviderError {
    #[error("routes admin provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("no polyline has been synthesized for this route yet")]
    NotFound,
}

/// HTTP client for the admin service's read-only routes-with-polyline endpoint.
#[derive(Clone)]
pub struct RoutesAdminProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RoutesAdminProvider {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, AdminProviderError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetches the stored polyline for a route by its display name.
    ///
    /// Returns `Ok(None)` when the admin service reports 404 (no polyline
    /// computed yet); any other transport or status failure is a transient
    /// [`AdminProviderError::Request`].
    pub async fn fetch_polyline(
        &self,
        route_name: &str,
    ) -> Result<Option<RoutePolylineResponse>, AdminProviderError> {
        let url = format!("{}/api/routes-with-polyline", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("routeName", route_name)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response.error_for_status()?;
        let body = response.json::<RoutePolylineResponse>().await?;
        Ok(Some(body))
    }
}
