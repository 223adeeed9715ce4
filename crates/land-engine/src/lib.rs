//! Conservation program revenue estimation.
//!
//! Parcels are quoted against CRP, EQIP and CSP payment schedules, and each quote list is
//! pruned by the GIS-aware heuristics in [`gis::filters`] and, for CRP, by the rule-driven
//! eligibility screen in [`eligibility`]. Scored parcels are kept in the record store under
//! [`parcels`].

pub mod config;
pub mod eligibility;
pub mod error;
pub mod gis;
pub mod location;
pub mod parcels;
pub mod programs;
pub mod schedules;
pub mod telemetry;
