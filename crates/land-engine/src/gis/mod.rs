//! Derived environmental attributes and the practice filters that consume them.

mod attributes;
pub mod filters;
mod processor;
mod terrain;

pub use attributes::{
    land_cover, wetland_class, GisAttributes, GisOverrides, LOW_SLOPE_PERCENT, WET_HYDRIC_PERCENT,
};
pub use filters::{
    classify_practice_name, filter_crp_practices, filter_csp_practices, filter_eqip_practices,
    CrpScreen, NameCategories, Practice,
};
pub use processor::{derive_attributes, point_from_geometry};
pub(crate) use processor::round_tenth;
pub use terrain::{TerrainAttributes, TerrainClient, TerrainError};
