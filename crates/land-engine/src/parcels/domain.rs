use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::ParcelMetrics;

pub type ParcelId = i64;

/// Acquisition figures for one parcel, as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelInput {
    pub state: String,
    pub county: String,
    pub acres: f64,
    pub purchase_price_per_acre: f64,
    pub expected_payment_per_acre_year1: f64,
    pub risk_score: f64,
}

impl ParcelInput {
    pub fn validate(&self) -> Result<(), ParcelValidationError> {
        if self.state.trim().is_empty() {
            return Err(ParcelValidationError::Blank { field: "state" });
        }
        if self.county.trim().is_empty() {
            return Err(ParcelValidationError::Blank { field: "county" });
        }
        positive("acres", self.acres)?;
        positive("purchase_price_per_acre", self.purchase_price_per_acre)?;
        if !self.expected_payment_per_acre_year1.is_finite()
            || self.expected_payment_per_acre_year1 < 0.0
        {
            return Err(ParcelValidationError::Negative {
                field: "expected_payment_per_acre_year1",
                value: self.expected_payment_per_acre_year1,
            });
        }
        if !(0.0..=1.0).contains(&self.risk_score) {
            return Err(ParcelValidationError::RiskOutOfRange(self.risk_score));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ParcelValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParcelValidationError::NotPositive { field, value })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParcelValidationError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be zero or greater (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("risk_score must be between 0 and 1 (got {0})")]
    RiskOutOfRange(f64),
    #[error("parcel {index}: {source}")]
    InBatch {
        index: usize,
        #[source]
        source: Box<ParcelValidationError>,
    },
}

/// Partial edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelUpdate {
    pub state: Option<String>,
    pub county: Option<String>,
    pub acres: Option<f64>,
    pub purchase_price_per_acre: Option<f64>,
    pub expected_payment_per_acre_year1: Option<f64>,
    pub risk_score: Option<f64>,
}

impl ParcelUpdate {
    pub fn merge_into(&self, current: &ParcelInput) -> ParcelInput {
        ParcelInput {
            state: non_blank(&self.state).unwrap_or_else(|| current.state.clone()),
            county: non_blank(&self.county).unwrap_or_else(|| current.county.clone()),
            acres: self.acres.unwrap_or(current.acres),
            purchase_price_per_acre: self
                .purchase_price_per_acre
                .unwrap_or(current.purchase_price_per_acre),
            expected_payment_per_acre_year1: self
                .expected_payment_per_acre_year1
                .unwrap_or(current.expected_payment_per_acre_year1),
            risk_score: self.risk_score.unwrap_or(current.risk_score),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// A validated parcel with freshly computed metrics, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredParcel {
    pub input: ParcelInput,
    pub metrics: ParcelMetrics,
    pub scored_at: DateTime<Utc>,
}

impl ScoredParcel {
    pub fn score(input: ParcelInput) -> Self {
        let metrics = ParcelMetrics::compute(&input);
        Self {
            input,
            metrics,
            scored_at: Utc::now(),
        }
    }

    pub fn into_record(self, id: ParcelId) -> ParcelRecord {
        ParcelRecord {
            id,
            input: self.input,
            metrics: self.metrics,
            scored_at: self.scored_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub id: ParcelId,
    #[serde(flatten)]
    pub input: ParcelInput,
    #[serde(flatten)]
    pub metrics: ParcelMetrics,
    pub scored_at: DateTime<Utc>,
}

/// Aggregates for every stored parcel in one county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyStats {
    pub state: String,
    pub county: String,
    pub parcel_count: u64,
    pub avg_las_score: f64,
    pub avg_raw_yield_percent: f64,
    pub total_expected_year1_payout: f64,
}
