//! Synthetic GIS derivation.
//!
//! There is no real spatial lookup here: attributes are deterministic stand-ins computed
//! from the state, county and (optionally) a point, good enough to drive the practice
//! heuristics consistently.

use serde_json::Value;

use super::attributes::{land_cover, wetland_class, GisAttributes};
use crate::location::{normalize_county, normalize_state};

const MOUNTAIN_STATES: &[&str] = &["colorado", "montana", "utah", "wyoming"];
const NORTHERN_MICHIGAN_LAT: f64 = 44.5;

/// Extracts `(lat, lon)` from a geometry payload.
///
/// Accepts `[lon, lat]`, `{"lat": .., "lon": ..}`, a GeoJSON `Point`, or WKT
/// `POINT(lon lat)`. Coordinates may be numbers or numeric strings.
pub fn point_from_geometry(geometry: &Value) -> Option<(f64, f64)> {
    match geometry {
        Value::Array(pair) => lon_lat_pair(pair),
        Value::Object(object) => {
            if let (Some(lat), Some(lon)) = (object.get("lat"), object.get("lon")) {
                return Some((coordinate(lat)?, coordinate(lon)?));
            }
            if object.get("type").and_then(Value::as_str) == Some("Point") {
                return object
                    .get("coordinates")
                    .and_then(Value::as_array)
                    .and_then(|pair| lon_lat_pair(pair));
            }
            None
        }
        Value::String(text) => point_from_wkt(text),
        _ => None,
    }
}

fn lon_lat_pair(pair: &[Value]) -> Option<(f64, f64)> {
    match pair {
        [lon, lat] => Some((coordinate(lat)?, coordinate(lon)?)),
        _ => None,
    }
}

fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn point_from_wkt(text: &str) -> Option<(f64, f64)> {
    let prefix = text.get(..6)?;
    if !prefix.eq_ignore_ascii_case("POINT(") {
        return None;
    }
    let body = text.get(6..text.len().saturating_sub(1))?;
    let mut parts = body.split_whitespace();
    let lon = parts.next()?.parse().ok()?;
    let lat = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lat, lon))
}

/// Derives the full attribute record for a parcel.
pub fn derive_attributes(geometry: Option<&Value>, state: &str, county: &str) -> GisAttributes {
    let (lat, lon) = match geometry.and_then(point_from_geometry) {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    };
    let state = normalize_state(state);
    let county = normalize_county(county);

    let land_cover = classify_land_cover(&state, lat);
    let slope = estimate_slope_percent(lat, lon, &state);
    let hydric = estimate_hydric_percent(&state, &county);
    let nwi_class = classify_wetland(hydric);
    let floodplain = hydric > 35.0 && slope < 4.0;
    let distance = estimate_distance_to_stream_m(lat, lon);

    GisAttributes {
        lat,
        lon,
        land_cover: land_cover.to_string(),
        slope_percent: round_tenth(slope),
        hydric_percent: round_tenth(hydric),
        nwi_class: nwi_class.to_string(),
        in_100yr_floodplain: floodplain,
        distance_to_stream_m: round_tenth(distance),
    }
}

fn classify_land_cover(state: &str, lat: Option<f64>) -> &'static str {
    if state.contains("michigan") {
        return match lat {
            Some(lat) if lat > NORTHERN_MICHIGAN_LAT => land_cover::FOREST,
            _ => land_cover::MIXED_AGRICULTURE,
        };
    }
    if state.contains("iowa") || state.contains("illinois") {
        return land_cover::CROPLAND;
    }
    if state.contains("texas") {
        return land_cover::RANGELAND;
    }
    land_cover::CROPLAND
}

fn estimate_slope_percent(lat: Option<f64>, lon: Option<f64>, state: &str) -> f64 {
    let (Some(_), Some(lon)) = (lat, lon) else {
        return 2.0;
    };
    let base = if MOUNTAIN_STATES.contains(&state) {
        8.0
    } else {
        2.0
    };
    base + lon.abs() % 3.0
}

fn estimate_hydric_percent(state: &str, county: &str) -> f64 {
    let checksum: u32 = state.chars().chain(county.chars()).map(u32::from).sum();
    f64::from(checksum % 60)
}

fn classify_wetland(hydric: f64) -> &'static str {
    if hydric > 40.0 {
        wetland_class::EMERGENT
    } else if hydric > 20.0 {
        wetland_class::OPEN_WATER
    } else {
        wetland_class::NONE
    }
}

fn estimate_distance_to_stream_m(lat: Option<f64>, lon: Option<f64>) -> f64 {
    match (lat, lon) {
        (Some(lat), Some(lon)) => 100.0 + (lat * lon).abs() % 900.0,
        _ => 500.0,
    }
}

pub(crate) fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
