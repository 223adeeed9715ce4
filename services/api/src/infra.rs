use land_engine::config::{AppConfig, DataConfig};
use land_engine::eligibility::{CsvRuleSource, RuleMapCache};
use land_engine::error::AppError;
use land_engine::gis::TerrainClient;
use land_engine::programs::ProgramScorer;
use land_engine::schedules::ScheduleSet;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads schedules and the rule source from the data directory and attaches the terrain
/// client when one is configured.
pub(crate) fn build_scorer(config: &AppConfig) -> Result<ProgramScorer, AppError> {
    let schedules = ScheduleSet::load(&config.data);
    let rules = warmed_rule_cache(&config.data);
    let scorer = ProgramScorer::new(schedules, rules, config.empty_eligibility);

    match config.terrain.base_url.as_deref() {
        Some(base_url) => {
            let client = TerrainClient::new(base_url, config.terrain.timeout)?;
            info!(base_url = client.base_url(), "terrain lookups enabled");
            Ok(scorer.with_terrain(client))
        }
        None => Ok(scorer),
    }
}

/// Rule cache with its map built up front; request handlers only read the published
/// map.
pub(crate) fn warmed_rule_cache(data: &DataConfig) -> Arc<RuleMapCache> {
    let rules = Arc::new(RuleMapCache::new(CsvRuleSource::new(data.crp_rules())));
    let loaded = rules.get().len();
    info!(rules = loaded, "crp eligibility rules loaded");
    rules
}

pub(crate) fn parse_state(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err("state must not be blank".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn parse_acres(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(acres) if acres.is_finite() && acres > 0.0 => Ok(acres),
        Ok(acres) => Err(format!("acres must be greater than zero (got {acres})")),
        Err(err) => Err(format!("failed to parse '{raw}' as acres ({err})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acres_must_be_positive_numbers() {
        assert_eq!(parse_acres(" 40.5 "), Ok(40.5));
        assert!(parse_acres("0").is_err());
        assert!(parse_acres("forty").is_err());
    }

    #[test]
    fn rule_cache_is_built_before_first_use() {
        let dir = std::env::temp_dir().join(format!("land-engine-warm-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("data dir");
        let data = DataConfig::new(&dir);
        std::fs::write(
            data.crp_rules(),
            "crp_practice_code,field_name,operator,value\nCP1,acres,>,1\n",
        )
        .expect("rule file");

        let rules = warmed_rule_cache(&data);
        assert!(rules.is_built());
        assert_eq!(rules.get().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn blank_state_is_rejected() {
        assert_eq!(parse_state(" MI "), Ok("MI".to_string()));
        assert!(parse_state("  ").is_err());
    }
}
