//! Optional remote terrain lookup.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

const ELEVATION_KEYS: &[&str] = &[
    "elevation_m",
    "elevation_raw",
    "elevation",
    "elev",
    "elev_m",
    "z",
];
const SLOPE_KEYS: &[&str] = &["slope_deg", "slope", "slope_raw", "slope_degrees"];

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("terrain request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("terrain service returned {status}")]
    Server { status: u16 },
    #[error("terrain response was not a JSON object")]
    Shape,
}

/// Terrain values reported for a point. Both are absent when the lookup failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TerrainAttributes {
    pub elevation_m: Option<f64>,
    pub slope_deg: Option<f64>,
}

impl TerrainAttributes {
    /// Picks the first non-null value for each attribute from the known key spellings.
    pub fn from_json(data: &Map<String, Value>) -> Self {
        Self {
            elevation_m: first_number(data, ELEVATION_KEYS),
            slope_deg: first_number(data, SLOPE_KEYS),
        }
    }

    /// Slope converted from degrees to percent grade.
    pub fn slope_percent(&self) -> Option<f64> {
        let degrees = self.slope_deg?;
        let percent = (degrees.to_radians().tan() * 100.0).abs();
        percent.is_finite().then_some(percent)
    }
}

fn first_number(data: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let value = keys
        .iter()
        .filter_map(|key| data.get(*key))
        .find(|value| !value.is_null())?;
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Client for the `/debug/terrain` endpoint of the GIS service.
#[derive(Debug, Clone)]
pub struct TerrainClient {
    client: reqwest::Client,
    base_url: String,
}

impl TerrainClient {
    /// `base_url` like `http://gis.internal:8000`; a trailing slash is ignored.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TerrainError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Looks up terrain for a point. Failures are logged and yield empty attributes.
    pub async fn fetch(&self, lat: f64, lon: f64) -> TerrainAttributes {
        match self.try_fetch(lat, lon).await {
            Ok(terrain) => terrain,
            Err(err) => {
                warn!(lat, lon, error = %err, "terrain lookup failed");
                TerrainAttributes::default()
            }
        }
    }

    pub async fn try_fetch(&self, lat: f64, lon: f64) -> Result<TerrainAttributes, TerrainError> {
        let url = format!("{}/debug/terrain", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("lat", lat), ("lon", lon)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TerrainError::Server {
                status: status.as_u16(),
            });
        }

        let body: Value = resp.json().await?;
        let Value::Object(data) = body else {
            return Err(TerrainError::Shape);
        };
        let terrain = TerrainAttributes::from_json(&data);
        debug!(lat, lon, ?terrain, "terrain lookup complete");
        Ok(terrain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn first_non_null_key_wins() {
        let terrain = TerrainAttributes::from_json(&object(json!({
            "elevation_m": null,
            "elevation": 251.5,
            "z": 9.0,
            "slope": "3.2",
        })));
        assert_eq!(terrain.elevation_m, Some(251.5));
        assert_eq!(terrain.slope_deg, Some(3.2));
    }

    #[test]
    fn unknown_payload_yields_nothing() {
        let terrain = TerrainAttributes::from_json(&object(json!({"height": 12})));
        assert_eq!(terrain, TerrainAttributes::default());
        assert_eq!(terrain.slope_percent(), None);
    }

    #[test]
    fn slope_degrees_convert_to_percent() {
        let terrain = TerrainAttributes {
            elevation_m: None,
            slope_deg: Some(45.0),
        };
        let percent = terrain.slope_percent().expect("finite slope");
        assert!((percent - 100.0).abs() < 1e-9);

        let vertical = TerrainAttributes {
            elevation_m: None,
            slope_deg: Some(90.0),
        };
        // tan(90°) is huge but finite in floating point; it must still be a number.
        assert!(vertical.slope_percent().is_some_and(f64::is_finite));
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_empty() {
        let client =
            TerrainClient::new("http://127.0.0.1:9/", Duration::from_millis(200)).expect("client");
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        assert_eq!(client.fetch(41.7, -93.6).await, TerrainAttributes::default());
    }
}
