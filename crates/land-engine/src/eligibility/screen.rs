use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::rule_map::RuleMap;
use super::value::ParcelAttributes;

/// Practice codes whose every condition holds for the parcel.
///
/// An empty rule map yields an empty set; use [`screen`] when the caller must tell
/// "rules disabled" apart from "nothing qualified".
pub fn eligible_practices(parcel: &ParcelAttributes, rules: &RuleMap) -> BTreeSet<String> {
    rules
        .iter()
        .filter(|(_, rule)| rule.is_satisfied_by(parcel))
        .map(|(code, _)| code.to_string())
        .collect()
}

/// Outcome of screening a parcel against a rule map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "codes", rename_all = "snake_case")]
pub enum Eligibility {
    /// No rules are loaded; every practice passes.
    Unrestricted,
    /// Rules are loaded; only the listed codes qualified.
    Restricted(BTreeSet<String>),
}

impl Eligibility {
    pub fn allows(&self, code: &str, policy: EmptyEligibilityPolicy) -> bool {
        match self {
            Eligibility::Unrestricted => true,
            Eligibility::Restricted(codes) if codes.is_empty() => {
                policy == EmptyEligibilityPolicy::PassThrough
            }
            Eligibility::Restricted(codes) => codes.contains(code),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Eligibility::Restricted(_))
    }
}

pub fn screen(parcel: &ParcelAttributes, rules: &RuleMap) -> Eligibility {
    if rules.is_empty() {
        Eligibility::Unrestricted
    } else {
        Eligibility::Restricted(eligible_practices(parcel, rules))
    }
}

/// What a loaded rule map does when a parcel qualifies for no practice at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyEligibilityPolicy {
    /// Nothing qualified, so nothing is offered.
    #[default]
    Exclude,
    /// Treat an empty eligible set like disabled rules and keep every practice.
    PassThrough,
}

impl EmptyEligibilityPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "exclude" => Some(Self::Exclude),
            "pass-through" | "passthrough" => Some(Self::PassThrough),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::condition::Condition;

    fn rules() -> RuleMap {
        let mut rules = RuleMap::empty();
        rules.push("CP01", Condition::new("land_cover", "in", "cropland,pasture"));
        rules.push("CP01", Condition::new("slope_percent", "<=", "8"));
        rules.push("CP23", Condition::new("nwi_class", "!=", "NONE"));
        rules
    }

    #[test]
    fn every_condition_must_hold() {
        let steep_cropland = ParcelAttributes::new()
            .with("land_cover", "cropland")
            .with("slope_percent", 12.0)
            .with("nwi_class", "NONE");

        assert!(eligible_practices(&steep_cropland, &rules()).is_empty());

        let gentle_cropland = steep_cropland.clone().with("slope_percent", 3.0);
        let eligible = eligible_practices(&gentle_cropland, &rules());
        assert_eq!(eligible.into_iter().collect::<Vec<_>>(), vec!["CP01"]);
    }

    #[test]
    fn empty_rules_return_empty_set_but_unrestricted_screen() {
        let parcel = ParcelAttributes::new().with("land_cover", "cropland");
        assert!(eligible_practices(&parcel, &RuleMap::empty()).is_empty());
        assert_eq!(screen(&parcel, &RuleMap::empty()), Eligibility::Unrestricted);
    }

    #[test]
    fn empty_restriction_follows_policy() {
        let nothing = Eligibility::Restricted(BTreeSet::new());
        assert!(!nothing.allows("CP01", EmptyEligibilityPolicy::Exclude));
        assert!(nothing.allows("CP01", EmptyEligibilityPolicy::PassThrough));

        let some = Eligibility::Restricted(BTreeSet::from(["CP01".to_string()]));
        assert!(some.allows("CP01", EmptyEligibilityPolicy::Exclude));
        assert!(!some.allows("CP02", EmptyEligibilityPolicy::PassThrough));
        assert!(Eligibility::Unrestricted.allows("CP99", EmptyEligibilityPolicy::Exclude));
    }

    #[test]
    fn policy_parses_common_spellings() {
        assert_eq!(
            EmptyEligibilityPolicy::parse("Pass_Through"),
            Some(EmptyEligibilityPolicy::PassThrough)
        );
        assert_eq!(
            EmptyEligibilityPolicy::parse(" exclude "),
            Some(EmptyEligibilityPolicy::Exclude)
        );
        assert_eq!(EmptyEligibilityPolicy::parse("ignore"), None);
    }
}
