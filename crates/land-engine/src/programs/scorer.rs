use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::eligibility::{EmptyEligibilityPolicy, RuleMapCache};
use crate::gis::{
    derive_attributes, filter_crp_practices, filter_csp_practices, filter_eqip_practices,
    round_tenth, CrpScreen, GisAttributes, GisOverrides, TerrainClient,
};
use crate::schedules::{
    quote_cost_share, quote_crp, CostSharePracticeQuote, CrpPracticeQuote, ProgramQuote,
    ScheduleSet,
};

/// A parcel to quote: location, size, optional geometry and attribute overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<String>,
    pub state: String,
    pub county: String,
    pub acres: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(flatten)]
    pub overrides: GisOverrides,
}

impl ParcelRequest {
    pub fn new(state: impl Into<String>, county: impl Into<String>, acres: f64) -> Self {
        Self {
            state: state.into(),
            county: county.into(),
            acres,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.state.trim().is_empty() {
            return Err(ScoringError::Blank("state"));
        }
        if self.county.trim().is_empty() {
            return Err(ScoringError::Blank("county"));
        }
        if !(self.acres.is_finite() && self.acres > 0.0) {
            return Err(ScoringError::NonPositiveAcres(self.acres));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("acres must be greater than zero (got {0})")]
    NonPositiveAcres(f64),
}

/// Derived GIS record plus the filtered quote of every program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreAllResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<String>,
    pub state: String,
    pub county: String,
    pub acres: f64,
    pub gis: GisAttributes,
    pub crp: ProgramQuote<CrpPracticeQuote>,
    pub eqip: ProgramQuote<CostSharePracticeQuote>,
    pub csp: ProgramQuote<CostSharePracticeQuote>,
}

/// Quotes parcels against the loaded schedules and prunes each program's practices.
pub struct ProgramScorer {
    schedules: ScheduleSet,
    rules: Arc<RuleMapCache>,
    policy: EmptyEligibilityPolicy,
    terrain: Option<TerrainClient>,
}

impl ProgramScorer {
    pub fn new(
        schedules: ScheduleSet,
        rules: Arc<RuleMapCache>,
        policy: EmptyEligibilityPolicy,
    ) -> Self {
        Self {
            schedules,
            rules,
            policy,
            terrain: None,
        }
    }

    pub fn with_terrain(mut self, terrain: TerrainClient) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn schedules(&self) -> &ScheduleSet {
        &self.schedules
    }

    /// Derived attributes, with the remote terrain slope when one is available and the
    /// caller's overrides applied last.
    pub async fn gis_for(&self, request: &ParcelRequest) -> GisAttributes {
        let mut gis =
            derive_attributes(request.geometry.as_ref(), &request.state, &request.county);

        if request.overrides.slope_percent.is_none() {
            if let (Some(terrain), Some(lat), Some(lon)) = (&self.terrain, gis.lat, gis.lon) {
                if let Some(slope) = terrain.fetch(lat, lon).await.slope_percent() {
                    gis.slope_percent = round_tenth(slope);
                }
            }
        }

        gis.apply(&request.overrides);
        gis
    }

    pub async fn quote_crp(
        &self,
        request: &ParcelRequest,
    ) -> Result<ProgramQuote<CrpPracticeQuote>, ScoringError> {
        request.validate()?;
        let gis = self.gis_for(request).await;
        Ok(self.crp_for(request, &gis))
    }

    pub async fn quote_eqip(
        &self,
        request: &ParcelRequest,
    ) -> Result<ProgramQuote<CostSharePracticeQuote>, ScoringError> {
        request.validate()?;
        let gis = self.gis_for(request).await;
        Ok(self.eqip_for(request, &gis))
    }

    pub async fn quote_csp(
        &self,
        request: &ParcelRequest,
    ) -> Result<ProgramQuote<CostSharePracticeQuote>, ScoringError> {
        request.validate()?;
        let gis = self.gis_for(request).await;
        Ok(self.csp_for(request, &gis))
    }

    pub async fn score_all(
        &self,
        request: &ParcelRequest,
    ) -> Result<ScoreAllResponse, ScoringError> {
        request.validate()?;
        let gis = self.gis_for(request).await;
        let crp = self.crp_for(request, &gis);
        let eqip = self.eqip_for(request, &gis);
        let csp = self.csp_for(request, &gis);

        Ok(ScoreAllResponse {
            parcel_id: request.parcel_id.clone(),
            state: crp.state.clone(),
            county: crp.county.clone(),
            acres: request.acres,
            gis,
            crp,
            eqip,
            csp,
        })
    }

    /// Drops the cached rule map; returns the number of practice rules after rebuilding.
    pub fn reload_rules(&self) -> usize {
        self.rules.invalidate();
        self.rules.get().len()
    }

    pub fn crp_counties(&self, state: &str) -> Vec<String> {
        self.schedules.crp.counties_for(state)
    }

    fn crp_for(
        &self,
        request: &ParcelRequest,
        gis: &GisAttributes,
    ) -> ProgramQuote<CrpPracticeQuote> {
        let quote =
            quote_crp(&self.schedules.crp, &request.state, &request.county, request.acres);
        let rules = self.rules.get();
        let screen = CrpScreen {
            state: &quote.state,
            county: &quote.county,
            acres: quote.acres,
            rules: &rules,
            policy: self.policy,
        };
        let practices = filter_crp_practices(&quote.practices, gis, &screen);
        debug!(
            program = "crp",
            state = %quote.state,
            county = %quote.county,
            quoted = quote.practices.len(),
            kept = practices.len(),
            "practices filtered"
        );
        quote.with_practices(practices)
    }

    fn eqip_for(
        &self,
        request: &ParcelRequest,
        gis: &GisAttributes,
    ) -> ProgramQuote<CostSharePracticeQuote> {
        let quote =
            quote_cost_share(&self.schedules.eqip, &request.state, &request.county, request.acres);
        let practices = filter_eqip_practices(&quote.practices, gis);
        debug!(
            program = "eqip",
            quoted = quote.practices.len(),
            kept = practices.len(),
            "practices filtered"
        );
        quote.with_practices(practices)
    }

    fn csp_for(
        &self,
        request: &ParcelRequest,
        gis: &GisAttributes,
    ) -> ProgramQuote<CostSharePracticeQuote> {
        let quote =
            quote_cost_share(&self.schedules.csp, &request.state, &request.county, request.acres);
        let practices = filter_csp_practices(&quote.practices, gis);
        debug!(
            program = "csp",
            quoted = quote.practices.len(),
            kept = practices.len(),
            "practices filtered"
        );
        quote.with_practices(practices)
    }
}
