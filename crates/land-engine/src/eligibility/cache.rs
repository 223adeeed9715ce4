use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{info, warn};

use super::rule_map::{RuleMap, RuleSheet};

/// Where eligibility rules come from.
pub trait RuleSource: Send + Sync {
    /// Short human-readable origin used in log lines.
    fn describe(&self) -> String;
    fn load(&self) -> Result<RuleSheet, RuleSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuleSourceError {
    #[error("failed to open rule source {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid rule CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Rule sheet stored as a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvRuleSource {
    path: PathBuf,
}

impl CsvRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for CsvRuleSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RuleSheet, RuleSourceError> {
        let file = File::open(&self.path).map_err(|source| RuleSourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        RuleSheet::from_reader(file).map_err(|source| RuleSourceError::Csv {
            path: self.path.clone(),
            source,
        })
    }
}

impl RuleSource for RuleSheet {
    fn describe(&self) -> String {
        format!("in-memory sheet ({} rows)", self.rows().len())
    }

    fn load(&self) -> Result<RuleSheet, RuleSourceError> {
        Ok(self.clone())
    }
}

/// Lazily built, shared rule map.
///
/// The first [`get`](Self::get) builds the map while holding the build lock, so
/// concurrent callers wait for that single build and then share the published `Arc`.
/// [`invalidate`](Self::invalidate) drops the published map and the next `get` rebuilds.
/// Source failures publish an empty map, which disables rule filtering.
pub struct RuleMapCache {
    source: Box<dyn RuleSource>,
    published: RwLock<Option<Arc<RuleMap>>>,
    build_lock: Mutex<()>,
}

impl RuleMapCache {
    pub fn new(source: impl RuleSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            published: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Cache that always serves an empty map.
    pub fn disabled() -> Self {
        Self::new(RuleSheet::default())
    }

    pub fn get(&self) -> Arc<RuleMap> {
        if let Some(map) = self.peek() {
            return map;
        }

        let _building = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(map) = self.peek() {
            return map;
        }

        let map = Arc::new(self.build());
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&map));
        map
    }

    pub fn invalidate(&self) {
        let _building = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_built(&self) -> bool {
        self.peek().is_some()
    }

    fn peek(&self) -> Option<Arc<RuleMap>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn build(&self) -> RuleMap {
        let origin = self.source.describe();
        match self.source.load() {
            Ok(sheet) if sheet.columns().is_empty() => {
                info!(source = %origin, "no eligibility rules configured");
                RuleMap::empty()
            }
            Ok(sheet) => {
                let missing = sheet.missing_columns();
                if !missing.is_empty() {
                    warn!(
                        source = %origin,
                        ?missing,
                        "eligibility rule sheet has unexpected columns; rule filtering disabled"
                    );
                    return RuleMap::empty();
                }

                let map = RuleMap::from_sheet(&sheet);
                info!(source = %origin, practices = map.len(), "eligibility rules loaded");
                map
            }
            Err(err) => {
                warn!(source = %origin, error = %err, "eligibility rules unavailable; rule filtering disabled");
                RuleMap::empty()
            }
        }
    }
}

impl std::fmt::Debug for RuleMapCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleMapCache")
            .field("source", &self.source.describe())
            .field("built", &self.is_built())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct CountingSource {
        loads: Arc<AtomicUsize>,
    }

    impl RuleSource for CountingSource {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        fn load(&self) -> Result<RuleSheet, RuleSourceError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(RuleSheet::new(
                vec![
                    "crp_practice_code".into(),
                    "field_name".into(),
                    "operator".into(),
                    "value".into(),
                ],
                vec![vec![
                    "CP01".into(),
                    "slope_percent".into(),
                    "<=".into(),
                    "8".into(),
                ]],
            ))
        }
    }

    fn counting_cache() -> (RuleMapCache, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = RuleMapCache::new(CountingSource {
            loads: Arc::clone(&loads),
        });
        (cache, loads)
    }

    #[test]
    fn concurrent_readers_share_a_single_build() {
        let (cache, loads) = counting_cache();

        let maps = thread::scope(|scope| {
            let handles = (0..8)
                .map(|_| scope.spawn(|| cache.get()))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("reader thread"))
                .collect::<Vec<_>>()
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(maps.iter().all(|map| map.len() == 1));
        assert!(maps.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn invalidation_forces_a_rebuild() {
        let (cache, loads) = counting_cache();
        assert!(!cache.is_built());

        cache.get();
        cache.get();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.invalidate();
        assert!(!cache.is_built());
        cache.get();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_file_degrades_to_empty_map() {
        let cache = RuleMapCache::new(CsvRuleSource::new("/nonexistent/crp_rules.csv"));
        assert!(cache.get().is_empty());
        assert!(cache.is_built());
    }

    #[test]
    fn malformed_schema_degrades_to_empty_map() {
        let cache = RuleMapCache::new(RuleSheet::new(
            vec!["code".into(), "field".into()],
            vec![vec!["CP01".into(), "slope_percent".into()]],
        ));
        assert!(cache.get().is_empty());
    }
}
