use serde::{Deserialize, Serialize};

use super::loader::{CostShareScheduleRow, CrpScheduleRow, PaymentSchedule};
use crate::gis::Practice;
use crate::location::{normalize_county, normalize_state};

/// Schedule units that are priced per acre rather than as a flat amount.
pub const PER_ACRE_UNITS: &[&str] = &["ac", "acre", "acres", "ac.", "ac/yr", "acr"];
pub const DEFAULT_CRP_CONTRACT_YEARS: u32 = 10;
pub const COST_SHARE_CONTRACT_YEARS: u32 = 1;

/// Parses a schedule cell. Blank, malformed, and non-finite values are `None`.
pub fn safe_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrpPracticeQuote {
    pub crp_practice_code: String,
    pub crp_practice_name: String,
    pub base_rental_rate: f64,
    pub annual_payment: f64,
    pub total_contract_payment: f64,
    pub contract_years: u32,
}

impl Practice for CrpPracticeQuote {
    fn practice_code(&self) -> &str {
        &self.crp_practice_code
    }

    fn practice_name(&self) -> &str {
        &self.crp_practice_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentBasis {
    PerAcre,
    Flat,
}

impl PaymentBasis {
    pub fn for_unit(unit: &str) -> Self {
        let unit = unit.trim().to_lowercase();
        if PER_ACRE_UNITS.contains(&unit.as_str()) {
            PaymentBasis::PerAcre
        } else {
            PaymentBasis::Flat
        }
    }
}

/// EQIP or CSP payment scenario priced for a parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSharePracticeQuote {
    pub practice_code: String,
    pub scenario_code: String,
    pub scenario_name: String,
    pub unit: String,
    pub payment_type: String,
    pub unit_rate: f64,
    pub payment_basis: PaymentBasis,
    /// Zero for flat-rate scenarios.
    pub payment_per_acre: f64,
    pub annual_payment: f64,
    pub total_contract_payment: f64,
    pub contract_years: u32,
}

impl Practice for CostSharePracticeQuote {
    fn practice_code(&self) -> &str {
        &self.practice_code
    }

    fn practice_name(&self) -> &str {
        &self.scenario_name
    }
}

/// Quoted practices for one program at one location, highest annual payment first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramQuote<P> {
    pub state: String,
    pub county: String,
    pub acres: f64,
    pub practices: Vec<P>,
}

impl<P> ProgramQuote<P> {
    fn new(state: &str, county: &str, acres: f64, practices: Vec<P>) -> Self {
        Self {
            state: normalize_state(state),
            county: normalize_county(county),
            acres,
            practices,
        }
    }

    /// Same location and acreage with a different practice list.
    pub fn with_practices<Q>(&self, practices: Vec<Q>) -> ProgramQuote<Q> {
        ProgramQuote {
            state: self.state.clone(),
            county: self.county.clone(),
            acres: self.acres,
            practices,
        }
    }
}

pub fn quote_crp(
    schedule: &PaymentSchedule<CrpScheduleRow>,
    state: &str,
    county: &str,
    acres: f64,
) -> ProgramQuote<CrpPracticeQuote> {
    let mut practices: Vec<CrpPracticeQuote> = schedule
        .rows_for(state, county)
        .iter()
        .map(|row| {
            let base_rental_rate = safe_number(&row.base_rental_rate).unwrap_or(0.0);
            let contract_years = contract_years(&row.contract_length_years);
            let annual_payment = base_rental_rate * acres;
            CrpPracticeQuote {
                crp_practice_code: row.crp_practice_code.clone(),
                crp_practice_name: row.crp_practice_name.clone(),
                base_rental_rate,
                annual_payment,
                total_contract_payment: annual_payment * f64::from(contract_years),
                contract_years,
            }
        })
        .collect();

    practices.sort_by(|a, b| b.annual_payment.total_cmp(&a.annual_payment));
    ProgramQuote::new(state, county, acres, practices)
}

/// Whole years, truncated; anything that is not at least one year falls back to the
/// default term.
fn contract_years(raw: &str) -> u32 {
    match safe_number(raw).map(f64::trunc) {
        Some(years) if (1.0..=f64::from(u32::MAX)).contains(&years) => years as u32,
        _ => DEFAULT_CRP_CONTRACT_YEARS,
    }
}

pub fn quote_cost_share(
    schedule: &PaymentSchedule<CostShareScheduleRow>,
    state: &str,
    county: &str,
    acres: f64,
) -> ProgramQuote<CostSharePracticeQuote> {
    let mut practices: Vec<CostSharePracticeQuote> = schedule
        .rows_for(state, county)
        .iter()
        .map(|row| {
            let unit_rate = safe_number(&row.unit_rate).unwrap_or(0.0);
            let payment_basis = PaymentBasis::for_unit(&row.unit);
            let (payment_per_acre, annual_payment) = match payment_basis {
                PaymentBasis::PerAcre => (unit_rate, unit_rate * acres),
                PaymentBasis::Flat => (0.0, unit_rate),
            };
            CostSharePracticeQuote {
                practice_code: row.practice_code.clone(),
                scenario_code: row.scenario_code.clone(),
                scenario_name: row.scenario_name.clone(),
                unit: row.unit.clone(),
                payment_type: row.payment_type.clone(),
                unit_rate,
                payment_basis,
                payment_per_acre,
                annual_payment,
                total_contract_payment: annual_payment * f64::from(COST_SHARE_CONTRACT_YEARS),
                contract_years: COST_SHARE_CONTRACT_YEARS,
            }
        })
        .collect();

    practices.sort_by(|a, b| b.annual_payment.total_cmp(&a.annual_payment));
    ProgramQuote::new(state, county, acres, practices)
}
