use serde::{Deserialize, Serialize};

use crate::eligibility::ParcelAttributes;

/// Land-cover categories produced by the synthetic classifier.
pub mod land_cover {
    pub const CROPLAND: &str = "cropland";
    pub const MIXED_AGRICULTURE: &str = "mixed_agriculture";
    pub const FOREST: &str = "forest";
    pub const RANGELAND: &str = "rangeland";
    pub const DEVELOPED: &str = "developed";
}

/// Wetland inventory codes produced by the synthetic classifier.
pub mod wetland_class {
    pub const EMERGENT: &str = "PEM1A";
    pub const OPEN_WATER: &str = "PUBH";
    pub const NONE: &str = "NONE";
}

/// Hydric-soil share at or above which a parcel counts as wet.
pub const WET_HYDRIC_PERCENT: f64 = 20.0;
/// Slope below which erosion-control practices are not worth offering.
pub const LOW_SLOPE_PERCENT: f64 = 2.0;

/// Environmental descriptors derived for a parcel location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GisAttributes {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub land_cover: String,
    pub slope_percent: f64,
    pub hydric_percent: f64,
    pub nwi_class: String,
    pub in_100yr_floodplain: bool,
    pub distance_to_stream_m: f64,
}

impl GisAttributes {
    pub fn is_developed(&self) -> bool {
        self.land_cover
            .trim()
            .eq_ignore_ascii_case(land_cover::DEVELOPED)
    }

    pub fn has_mapped_wetland(&self) -> bool {
        self.nwi_class != wetland_class::NONE
    }

    /// Mapped wetland or hydric soils at or above [`WET_HYDRIC_PERCENT`].
    pub fn shows_wetness(&self) -> bool {
        self.has_mapped_wetland() || self.hydric_percent >= WET_HYDRIC_PERCENT
    }

    /// No mapped wetland and hydric soils below [`WET_HYDRIC_PERCENT`].
    pub fn is_dry_upland(&self) -> bool {
        !self.has_mapped_wetland() && self.hydric_percent < WET_HYDRIC_PERCENT
    }

    pub fn is_low_slope(&self) -> bool {
        self.slope_percent < LOW_SLOPE_PERCENT
    }

    /// Copies every attribute into a rule-evaluation parcel. Unknown coordinates are
    /// left out so rules see them as missing.
    pub fn write_into(&self, parcel: &mut ParcelAttributes) {
        if let Some(lat) = self.lat {
            parcel.insert("lat", lat);
        }
        if let Some(lon) = self.lon {
            parcel.insert("lon", lon);
        }
        parcel.insert("land_cover", self.land_cover.as_str());
        parcel.insert("slope_percent", self.slope_percent);
        parcel.insert("hydric_percent", self.hydric_percent);
        parcel.insert("nwi_class", self.nwi_class.as_str());
        parcel.insert("in_100yr_floodplain", self.in_100yr_floodplain);
        parcel.insert("distance_to_stream_m", self.distance_to_stream_m);
    }

    pub fn apply(&mut self, overrides: &GisOverrides) {
        if let Some(land_cover) = &overrides.land_cover {
            self.land_cover = land_cover.clone();
        }
        if let Some(slope) = overrides.slope_percent {
            self.slope_percent = slope;
        }
        if let Some(hydric) = overrides.hydric_percent {
            self.hydric_percent = hydric;
        }
        if let Some(nwi_class) = &overrides.nwi_class {
            self.nwi_class = nwi_class.clone();
        }
        if let Some(floodplain) = overrides.in_100yr_floodplain {
            self.in_100yr_floodplain = floodplain;
        }
        if let Some(distance) = overrides.distance_to_stream_m {
            self.distance_to_stream_m = distance;
        }
    }
}

/// Caller-supplied values that replace individual derived attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GisOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_percent: Option<f64>,
    #[serde(alias = "soil_hydric_percent", skip_serializing_if = "Option::is_none")]
    pub hydric_percent: Option<f64>,
    #[serde(alias = "nwi_wetland_type", skip_serializing_if = "Option::is_none")]
    pub nwi_class: Option<String>,
    #[serde(alias = "floodplain", skip_serializing_if = "Option::is_none")]
    pub in_100yr_floodplain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_to_stream_m: Option<f64>,
}

impl GisOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
