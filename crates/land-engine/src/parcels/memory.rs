use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{CountyStats, ParcelId, ParcelRecord, ScoredParcel};
use super::metrics::round_cents;
use super::repository::{ParcelRepository, RepositoryError};

/// Process-local parcel store.
#[derive(Debug, Default)]
pub struct InMemoryParcelRepository {
    state: Mutex<Store>,
}

#[derive(Debug)]
struct Store {
    next_id: ParcelId,
    records: BTreeMap<ParcelId, ParcelRecord>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: BTreeMap::new(),
        }
    }
}

impl InMemoryParcelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("parcel store lock poisoned".into()))
    }
}

impl Store {
    fn insert(&mut self, parcel: ScoredParcel) -> ParcelRecord {
        let id = self.next_id;
        self.next_id += 1;
        let record = parcel.into_record(id);
        self.records.insert(id, record.clone());
        record
    }
}

impl ParcelRepository for InMemoryParcelRepository {
    fn insert(&self, parcel: ScoredParcel) -> Result<ParcelRecord, RepositoryError> {
        Ok(self.store()?.insert(parcel))
    }

    fn insert_batch(
        &self,
        parcels: Vec<ScoredParcel>,
    ) -> Result<Vec<ParcelRecord>, RepositoryError> {
        let mut store = self.store()?;
        Ok(parcels
            .into_iter()
            .map(|parcel| store.insert(parcel))
            .collect())
    }

    fn fetch(&self, id: ParcelId) -> Result<Option<ParcelRecord>, RepositoryError> {
        Ok(self.store()?.records.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<ParcelRecord>, RepositoryError> {
        Ok(self.store()?.records.values().cloned().collect())
    }

    fn top(&self, limit: usize) -> Result<Vec<ParcelRecord>, RepositoryError> {
        let mut records = self.list()?;
        records.sort_by(|a, b| b.metrics.las_score.total_cmp(&a.metrics.las_score));
        records.truncate(limit);
        Ok(records)
    }

    fn update(&self, id: ParcelId, parcel: ScoredParcel) -> Result<ParcelRecord, RepositoryError> {
        let mut store = self.store()?;
        let slot = store.records.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        *slot = parcel.into_record(id);
        Ok(slot.clone())
    }

    fn delete(&self, id: ParcelId) -> Result<(), RepositoryError> {
        self.store()?
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn reset(&self) -> Result<usize, RepositoryError> {
        let mut store = self.store()?;
        let removed = store.records.len();
        store.records.clear();
        Ok(removed)
    }

    fn county_stats(&self, state: Option<&str>) -> Result<Vec<CountyStats>, RepositoryError> {
        let store = self.store()?;
        Ok(aggregate_counties(
            store
                .records
                .values()
                .filter(|record| state.map_or(true, |state| record.input.state == state)),
        ))
    }
}

#[derive(Default)]
struct Totals {
    count: u64,
    las: f64,
    raw_yield: f64,
    payout: f64,
}

fn aggregate_counties<'a>(records: impl Iterator<Item = &'a ParcelRecord>) -> Vec<CountyStats> {
    let mut totals: BTreeMap<(String, String), Totals> = BTreeMap::new();
    for record in records {
        let key = (record.input.state.clone(), record.input.county.clone());
        let entry = totals.entry(key).or_default();
        entry.count += 1;
        entry.las += record.metrics.las_score;
        entry.raw_yield += record.metrics.raw_yield_percent;
        entry.payout += record.metrics.expected_year1_payout;
    }

    let mut ranked: Vec<(f64, CountyStats)> = totals
        .into_iter()
        .map(|((state, county), totals)| {
            let count = totals.count as f64;
            let avg_las = totals.las / count;
            let stats = CountyStats {
                state,
                county,
                parcel_count: totals.count,
                avg_las_score: round_cents(avg_las),
                avg_raw_yield_percent: round_cents(totals.raw_yield / count),
                total_expected_year1_payout: round_cents(totals.payout),
            };
            (avg_las, stats)
        })
        .collect();

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().map(|(_, stats)| stats).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcels::domain::ParcelInput;

    fn scored(county: &str, pay: f64) -> ScoredParcel {
        ScoredParcel::score(ParcelInput {
            state: "Iowa".into(),
            county: county.into(),
            acres: 10.0,
            purchase_price_per_acre: 1000.0,
            expected_payment_per_acre_year1: pay,
            risk_score: 0.0,
        })
    }

    #[test]
    fn ids_increase_and_survive_reset() {
        let repo = InMemoryParcelRepository::new();
        let first = repo.insert(scored("Story", 10.0)).expect("insert");
        let batch = repo
            .insert_batch(vec![scored("Polk", 20.0), scored("Story", 30.0)])
            .expect("batch");
        assert_eq!(first.id, 1);
        assert_eq!(batch.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);

        assert_eq!(repo.reset().expect("reset"), 3);
        assert_eq!(repo.insert(scored("Story", 10.0)).expect("insert").id, 4);
    }

    #[test]
    fn top_orders_by_score_with_stable_ties() {
        let repo = InMemoryParcelRepository::new();
        for pay in [10.0, 30.0, 30.0, 20.0] {
            repo.insert(scored("Story", pay)).expect("insert");
        }
        let top = repo.top(3).expect("top");
        assert_eq!(top.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn missing_rows_report_not_found() {
        let repo = InMemoryParcelRepository::new();
        assert!(matches!(repo.delete(9), Err(RepositoryError::NotFound)));
        assert!(matches!(
            repo.update(9, scored("Story", 1.0)),
            Err(RepositoryError::NotFound)
        ));
        assert!(repo.fetch(9).expect("fetch").is_none());
    }

    #[test]
    fn county_stats_average_and_rank() {
        let repo = InMemoryParcelRepository::new();
        repo.insert(scored("Story", 10.0)).expect("insert");
        repo.insert(scored("Story", 30.0)).expect("insert");
        repo.insert(scored("Polk", 50.0)).expect("insert");

        let stats = repo.county_stats(None).expect("stats");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].county, "Polk");
        assert_eq!(stats[1].parcel_count, 2);
        assert_eq!(stats[1].avg_raw_yield_percent, 2.0);
        assert_eq!(stats[1].avg_las_score, 40.0);
        assert_eq!(stats[1].total_expected_year1_payout, 400.0);

        assert!(repo.county_stats(Some("Ohio")).expect("stats").is_empty());
    }
}
