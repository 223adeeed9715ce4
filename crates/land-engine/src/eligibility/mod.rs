//! Rule-driven practice eligibility.
//!
//! A rule source (a CSV sheet of `practice code, field, operator, value` rows) is turned
//! into a [`RuleMap`]; each practice qualifies when every one of its conditions holds for
//! the parcel's [`ParcelAttributes`]. Evaluation never errors: malformed conditions are
//! simply not met, and a malformed or missing source disables rules altogether.

mod cache;
mod condition;
mod rule_map;
mod screen;
mod value;

pub use cache::{CsvRuleSource, RuleMapCache, RuleSource, RuleSourceError};
pub use condition::{evaluate, Condition, Operator};
pub use rule_map::{Rule, RuleMap, RuleSheet, CODE_COLUMNS};
pub use screen::{eligible_practices, screen, Eligibility, EmptyEligibilityPolicy};
pub use value::{AttributeValue, ParcelAttributes, MISSING_TEXT};
