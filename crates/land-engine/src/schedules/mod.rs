//! Program payment schedules and the quote assemblers built on them.

mod loader;
mod quote;

pub use loader::{
    CostShareScheduleRow, CrpScheduleRow, PaymentSchedule, ScheduleError, ScheduleRow,
    LOCATION_COLUMNS,
};
pub use quote::{
    quote_cost_share, quote_crp, safe_number, CostSharePracticeQuote, CrpPracticeQuote,
    PaymentBasis, ProgramQuote, COST_SHARE_CONTRACT_YEARS, DEFAULT_CRP_CONTRACT_YEARS,
    PER_ACRE_UNITS,
};

use crate::config::DataConfig;

/// The three program schedules, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSet {
    pub crp: PaymentSchedule<CrpScheduleRow>,
    pub eqip: PaymentSchedule<CostShareScheduleRow>,
    pub csp: PaymentSchedule<CostShareScheduleRow>,
}

impl ScheduleSet {
    /// Unreadable files degrade to empty schedules; see [`PaymentSchedule::load`].
    pub fn load(data: &DataConfig) -> Self {
        Self {
            crp: PaymentSchedule::load(&data.crp_schedule(), "crp"),
            eqip: PaymentSchedule::load(&data.eqip_schedule(), "eqip"),
            csp: PaymentSchedule::load(&data.csp_schedule(), "csp"),
        }
    }
}
