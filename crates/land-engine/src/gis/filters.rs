//! GIS-aware pruning of quoted practices.
//!
//! Every filter is an order-preserving subset of its input: retained quotes are cloned
//! unchanged, nothing is re-sorted.

use super::attributes::GisAttributes;
use crate::eligibility::{screen, EmptyEligibilityPolicy, ParcelAttributes, RuleMap};

pub const WETLAND_KEYWORDS: &[&str] = &[
    "wetland",
    "marsh",
    "bog",
    "floodplain",
    "riparian",
    "stream buffer",
];
pub const EROSION_KEYWORDS: &[&str] = &[
    "erosion",
    "gully",
    "terrace",
    "waterway",
    "grade stabilization",
    "diversion",
];
pub const PASTURE_KEYWORDS: &[&str] = &["pasture", "grazing", "rangeland", "forage"];

/// What a quoted practice looks like to the filters.
pub trait Practice {
    fn practice_code(&self) -> &str;
    fn practice_name(&self) -> &str;
}

/// Keyword categories a practice name falls into. A name may hit several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameCategories {
    pub wetland: bool,
    pub erosion: bool,
    pub pasture: bool,
}

pub fn classify_practice_name(name: &str) -> NameCategories {
    let name = name.to_lowercase();
    let hits = |keywords: &[&str]| keywords.iter().any(|keyword| name.contains(keyword));
    NameCategories {
        wetland: hits(WETLAND_KEYWORDS),
        erosion: hits(EROSION_KEYWORDS),
        pasture: hits(PASTURE_KEYWORDS),
    }
}

/// Parcel context the CRP filter screens against the rule map.
#[derive(Debug, Clone, Copy)]
pub struct CrpScreen<'a> {
    pub state: &'a str,
    pub county: &'a str,
    pub acres: f64,
    pub rules: &'a RuleMap,
    pub policy: EmptyEligibilityPolicy,
}

impl CrpScreen<'_> {
    /// Location, acreage and every GIS attribute, keyed by rule field name.
    pub fn parcel(&self, gis: &GisAttributes) -> ParcelAttributes {
        let mut parcel = ParcelAttributes::new()
            .with("state", self.state)
            .with("county", self.county)
            .with("acres", self.acres);
        gis.write_into(&mut parcel);
        parcel
    }
}

pub fn filter_crp_practices<P>(
    quotes: &[P],
    gis: &GisAttributes,
    screen_ctx: &CrpScreen<'_>,
) -> Vec<P>
where
    P: Practice + Clone,
{
    if gis.is_developed() {
        return Vec::new();
    }

    let eligibility = screen(&screen_ctx.parcel(gis), screen_ctx.rules);
    let dry = gis.is_dry_upland();

    quotes
        .iter()
        .filter(|quote| eligibility.allows(quote.practice_code(), screen_ctx.policy))
        .filter(|quote| !(dry && classify_practice_name(quote.practice_name()).wetland))
        .cloned()
        .collect()
}

pub fn filter_eqip_practices<P>(quotes: &[P], gis: &GisAttributes) -> Vec<P>
where
    P: Practice + Clone,
{
    filter_cost_share(quotes, gis)
}

pub fn filter_csp_practices<P>(quotes: &[P], gis: &GisAttributes) -> Vec<P>
where
    P: Practice + Clone,
{
    filter_cost_share(quotes, gis)
}

fn filter_cost_share<P>(quotes: &[P], gis: &GisAttributes) -> Vec<P>
where
    P: Practice + Clone,
{
    let wet = gis.shows_wetness();
    let low_slope = gis.is_low_slope();

    quotes
        .iter()
        .filter(|quote| {
            let categories = classify_practice_name(quote.practice_name());
            !(categories.wetland && !wet) && !(categories.erosion && low_slope)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::Condition;
    use crate::gis::attributes::{land_cover, wetland_class};

    #[derive(Debug, Clone, PartialEq)]
    struct Quote {
        code: &'static str,
        name: &'static str,
    }

    impl Practice for Quote {
        fn practice_code(&self) -> &str {
            self.code
        }

        fn practice_name(&self) -> &str {
            self.name
        }
    }

    fn quotes() -> Vec<Quote> {
        vec![
            Quote { code: "CP23", name: "Wetland Restoration Buffer" },
            Quote { code: "CP01", name: "Cover Crop" },
            Quote { code: "CP08A", name: "Grassed Waterway" },
            Quote { code: "CP33", name: "Terrace Construction" },
            Quote { code: "CP22", name: "Riparian Forest Buffer" },
        ]
    }

    fn gis() -> GisAttributes {
        GisAttributes {
            lat: None,
            lon: None,
            land_cover: land_cover::CROPLAND.to_string(),
            slope_percent: 5.0,
            hydric_percent: 10.0,
            nwi_class: wetland_class::NONE.to_string(),
            in_100yr_floodplain: false,
            distance_to_stream_m: 500.0,
        }
    }

    fn codes(quotes: &[Quote]) -> Vec<&str> {
        quotes.iter().map(|quote| quote.code).collect()
    }

    fn crp(rules: &RuleMap, policy: EmptyEligibilityPolicy) -> CrpScreen<'_> {
        CrpScreen {
            state: "iowa",
            county: "story",
            acres: 40.0,
            rules,
            policy,
        }
    }

    #[test]
    fn classifier_matches_keyword_substrings() {
        let categories = classify_practice_name("Riparian GRAZING Terrace");
        assert!(categories.wetland && categories.erosion && categories.pasture);
        assert_eq!(classify_practice_name("Cover Crop"), NameCategories::default());
        assert!(classify_practice_name("Filter strip along stream buffer").wetland);
    }

    #[test]
    fn developed_land_gets_no_crp_practices() {
        let mut gis = gis();
        gis.land_cover = "Developed".to_string();
        let rules = RuleMap::empty();
        let kept = filter_crp_practices(
            &quotes(),
            &gis,
            &crp(&rules, EmptyEligibilityPolicy::PassThrough),
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn developed_land_overrides_fully_eligible_rules() {
        let mut rules = RuleMap::empty();
        for quote in quotes() {
            rules.push(quote.code, Condition::new("state", "==", "iowa"));
        }
        let wet = GisAttributes {
            hydric_percent: 60.0,
            nwi_class: wetland_class::EMERGENT.to_string(),
            ..gis()
        };
        let screen = crp(&rules, EmptyEligibilityPolicy::PassThrough);
        assert_eq!(filter_crp_practices(&quotes(), &wet, &screen).len(), 5);

        let developed = GisAttributes {
            land_cover: "developed".to_string(),
            ..wet
        };
        assert!(filter_crp_practices(&quotes(), &developed, &screen).is_empty());
    }

    #[test]
    fn dry_upland_drops_wetland_practices_only() {
        let rules = RuleMap::empty();
        let kept = filter_crp_practices(
            &quotes(),
            &gis(),
            &crp(&rules, EmptyEligibilityPolicy::Exclude),
        );
        assert_eq!(codes(&kept), vec!["CP01", "CP08A", "CP33"]);
    }

    #[test]
    fn wet_parcel_keeps_wetland_practices() {
        let mut gis = gis();
        gis.nwi_class = wetland_class::EMERGENT.to_string();
        let rules = RuleMap::empty();
        let kept = filter_crp_practices(
            &quotes(),
            &gis,
            &crp(&rules, EmptyEligibilityPolicy::Exclude),
        );
        assert_eq!(kept, quotes());
    }

    #[test]
    fn crp_rules_restrict_to_eligible_codes() {
        let mut rules = RuleMap::empty();
        rules.push("CP33", Condition::new("slope_percent", ">=", "4"));
        rules.push("CP01", Condition::new("state", "==", "iowa"));
        rules.push("CP23", Condition::new("hydric_percent", ">", "50"));

        let kept = filter_crp_practices(
            &quotes(),
            &gis(),
            &crp(&rules, EmptyEligibilityPolicy::Exclude),
        );
        assert_eq!(codes(&kept), vec!["CP01", "CP33"]);
    }

    #[test]
    fn nothing_eligible_follows_the_policy() {
        let mut rules = RuleMap::empty();
        rules.push("CP01", Condition::new("acres", ">", "1000"));

        let excluded = filter_crp_practices(
            &quotes(),
            &gis(),
            &crp(&rules, EmptyEligibilityPolicy::Exclude),
        );
        assert!(excluded.is_empty());

        let passed = filter_crp_practices(
            &quotes(),
            &gis(),
            &crp(&rules, EmptyEligibilityPolicy::PassThrough),
        );
        assert_eq!(codes(&passed), vec!["CP01", "CP08A", "CP33"]);
    }

    #[test]
    fn flat_land_drops_erosion_practices() {
        let mut flat = gis();
        flat.slope_percent = 1.0;
        let kept = filter_eqip_practices(&quotes(), &flat);
        assert_eq!(codes(&kept), vec!["CP01"]);

        let sloped = filter_csp_practices(&quotes(), &gis());
        assert_eq!(codes(&sloped), vec!["CP01", "CP08A", "CP33"]);
    }

    #[test]
    fn hydric_soils_count_as_wet_for_cost_share() {
        let mut gis = gis();
        gis.hydric_percent = 20.0;
        let kept = filter_eqip_practices(&quotes(), &gis);
        assert_eq!(kept, quotes());
    }

    #[test]
    fn survivors_keep_input_order() {
        let mut reversed = quotes();
        reversed.reverse();
        let kept = filter_csp_practices(&reversed, &gis());
        assert_eq!(codes(&kept), vec!["CP33", "CP08A", "CP01"]);
    }
}
