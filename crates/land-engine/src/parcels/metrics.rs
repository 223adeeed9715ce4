use serde::{Deserialize, Serialize};

use super::domain::ParcelInput;

const LAS_SCALE: f64 = 20.0;

/// Land acquisition scoring figures derived from a parcel's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParcelMetrics {
    pub las_score: f64,
    pub expected_year1_payout: f64,
    pub raw_yield_percent: f64,
}

impl ParcelMetrics {
    /// Each figure is rounded to cents after computing from unrounded intermediates.
    pub fn compute(input: &ParcelInput) -> Self {
        let expected_year1_payout = input.acres * input.expected_payment_per_acre_year1;
        let raw_yield_percent = if input.purchase_price_per_acre > 0.0 {
            input.expected_payment_per_acre_year1 / input.purchase_price_per_acre * 100.0
        } else {
            0.0
        };
        let las_score = raw_yield_percent * (1.0 - input.risk_score) * LAS_SCALE;

        Self {
            las_score: round_cents(las_score),
            expected_year1_payout: round_cents(expected_year1_payout),
            raw_yield_percent: round_cents(raw_yield_percent),
        }
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parcel(price: f64, pay: f64, risk: f64) -> ParcelInput {
        ParcelInput {
            state: "Michigan".into(),
            county: "Clare".into(),
            acres: 40.0,
            purchase_price_per_acre: price,
            expected_payment_per_acre_year1: pay,
            risk_score: risk,
        }
    }

    #[test]
    fn computes_yield_payout_and_score() {
        let metrics = ParcelMetrics::compute(&parcel(3000.0, 150.0, 0.25));
        assert_eq!(metrics.expected_year1_payout, 6000.0);
        assert_eq!(metrics.raw_yield_percent, 5.0);
        assert_eq!(metrics.las_score, 75.0);
    }

    #[test]
    fn score_uses_unrounded_yield() {
        // 100 / 3000 * 100 = 3.3333..; 3.3333.. * 0.9 * 20 = 60.0 exactly
        let metrics = ParcelMetrics::compute(&parcel(3000.0, 100.0, 0.1));
        assert_eq!(metrics.raw_yield_percent, 3.33);
        assert_eq!(metrics.las_score, 60.0);
    }

    #[test]
    fn zero_price_yields_zero() {
        let metrics = ParcelMetrics::compute(&parcel(0.0, 100.0, 0.0));
        assert_eq!(metrics.raw_yield_percent, 0.0);
        assert_eq!(metrics.las_score, 0.0);
    }

    #[test]
    fn full_risk_zeroes_the_score() {
        let metrics = ParcelMetrics::compute(&parcel(1000.0, 100.0, 1.0));
        assert_eq!(metrics.raw_yield_percent, 10.0);
        assert_eq!(metrics.las_score, 0.0);
    }
}
