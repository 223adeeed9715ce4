use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::domain::{CountyStats, ParcelId, ParcelInput, ParcelRecord, ScoredParcel};
use super::metrics::{round_cents, ParcelMetrics};
use super::repository::{ParcelRepository, RepositoryError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS parcels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    state TEXT NOT NULL,
    county TEXT NOT NULL,
    acres REAL NOT NULL,
    purchase_price_per_acre REAL NOT NULL,
    expected_payment_per_acre_year1 REAL NOT NULL,
    risk_score REAL NOT NULL,
    las_score REAL NOT NULL,
    expected_year1_payout REAL NOT NULL,
    raw_yield_percent REAL NOT NULL,
    scored_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS parcels_las_score ON parcels (las_score DESC);
";

const COLUMNS: &str = "id, state, county, acres, purchase_price_per_acre, \
    expected_payment_per_acre_year1, risk_score, las_score, expected_year1_payout, \
    raw_yield_percent, scored_at";

const INSERT: &str = "INSERT INTO parcels (
    state, county, acres, purchase_price_per_acre, expected_payment_per_acre_year1,
    risk_score, las_score, expected_year1_payout, raw_yield_percent, scored_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

/// Parcel store backed by a single SQLite connection.
#[derive(Debug)]
pub struct SqliteParcelRepository {
    conn: Mutex<Connection>,
}

impl SqliteParcelRepository {
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "parcel database opened");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("database connection lock poisoned".into()))
    }

    fn select(
        conn: &Connection,
        clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ParcelRecord>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM parcels {clause}");
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params, record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn insert_row(conn: &Connection, parcel: ScoredParcel) -> Result<ParcelRecord, rusqlite::Error> {
    let ScoredParcel {
        input,
        metrics,
        scored_at,
    } = &parcel;
    conn.execute(
        INSERT,
        params![
            input.state,
            input.county,
            input.acres,
            input.purchase_price_per_acre,
            input.expected_payment_per_acre_year1,
            input.risk_score,
            metrics.las_score,
            metrics.expected_year1_payout,
            metrics.raw_yield_percent,
            scored_at,
        ],
    )?;
    Ok(parcel.into_record(conn.last_insert_rowid()))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ParcelRecord> {
    Ok(ParcelRecord {
        id: row.get("id")?,
        input: ParcelInput {
            state: row.get("state")?,
            county: row.get("county")?,
            acres: row.get("acres")?,
            purchase_price_per_acre: row.get("purchase_price_per_acre")?,
            expected_payment_per_acre_year1: row.get("expected_payment_per_acre_year1")?,
            risk_score: row.get("risk_score")?,
        },
        metrics: ParcelMetrics {
            las_score: row.get("las_score")?,
            expected_year1_payout: row.get("expected_year1_payout")?,
            raw_yield_percent: row.get("raw_yield_percent")?,
        },
        scored_at: row.get("scored_at")?,
    })
}

impl ParcelRepository for SqliteParcelRepository {
    fn insert(&self, parcel: ScoredParcel) -> Result<ParcelRecord, RepositoryError> {
        let conn = self.conn()?;
        Ok(insert_row(&conn, parcel)?)
    }

    fn insert_batch(
        &self,
        parcels: Vec<ScoredParcel>,
    ) -> Result<Vec<ParcelRecord>, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let records = parcels
            .into_iter()
            .map(|parcel| insert_row(&tx, parcel))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;
        Ok(records)
    }

    fn fetch(&self, id: ParcelId) -> Result<Option<ParcelRecord>, RepositoryError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {COLUMNS} FROM parcels WHERE id = ?1");
        Ok(conn
            .query_row(&sql, [id], record_from_row)
            .optional()?)
    }

    fn list(&self) -> Result<Vec<ParcelRecord>, RepositoryError> {
        let conn = self.conn()?;
        Self::select(&conn, "ORDER BY id ASC", [])
    }

    fn top(&self, limit: usize) -> Result<Vec<ParcelRecord>, RepositoryError> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Self::select(&conn, "ORDER BY las_score DESC, id ASC LIMIT ?1", [limit])
    }

    fn update(&self, id: ParcelId, parcel: ScoredParcel) -> Result<ParcelRecord, RepositoryError> {
        let conn = self.conn()?;
        let ScoredParcel {
            input,
            metrics,
            scored_at,
        } = &parcel;
        let changed = conn.execute(
            "UPDATE parcels SET state = ?1, county = ?2, acres = ?3,
                purchase_price_per_acre = ?4, expected_payment_per_acre_year1 = ?5,
                risk_score = ?6, las_score = ?7, expected_year1_payout = ?8,
                raw_yield_percent = ?9, scored_at = ?10
             WHERE id = ?11",
            params![
                input.state,
                input.county,
                input.acres,
                input.purchase_price_per_acre,
                input.expected_payment_per_acre_year1,
                input.risk_score,
                metrics.las_score,
                metrics.expected_year1_payout,
                metrics.raw_yield_percent,
                scored_at,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(parcel.into_record(id))
    }

    fn delete(&self, id: ParcelId) -> Result<(), RepositoryError> {
        let conn = self.conn()?;
        match conn.execute("DELETE FROM parcels WHERE id = ?1", [id])? {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    fn reset(&self) -> Result<usize, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM parcels", [])?)
    }

    fn county_stats(&self, state: Option<&str>) -> Result<Vec<CountyStats>, RepositoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT state, county,
                    COUNT(*) AS parcel_count,
                    AVG(las_score) AS avg_las_score,
                    AVG(raw_yield_percent) AS avg_raw_yield_percent,
                    SUM(expected_year1_payout) AS total_expected_year1_payout
             FROM parcels
             WHERE ?1 IS NULL OR state = ?1
             GROUP BY state, county
             ORDER BY avg_las_score DESC, state ASC, county ASC",
        )?;
        let stats = stmt
            .query_map([state], |row| {
                let real = |name: &str| -> rusqlite::Result<f64> {
                    Ok(row.get::<_, Option<f64>>(name)?.unwrap_or(0.0))
                };
                let count: i64 = row.get("parcel_count")?;
                Ok(CountyStats {
                    state: row.get("state")?,
                    county: row.get("county")?,
                    parcel_count: u64::try_from(count).unwrap_or_default(),
                    avg_las_score: round_cents(real("avg_las_score")?),
                    avg_raw_yield_percent: round_cents(real("avg_raw_yield_percent")?),
                    total_expected_year1_payout: round_cents(real("total_expected_year1_payout")?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(state: &str, county: &str, pay: f64) -> ScoredParcel {
        ScoredParcel::score(ParcelInput {
            state: state.into(),
            county: county.into(),
            acres: 10.0,
            purchase_price_per_acre: 1000.0,
            expected_payment_per_acre_year1: pay,
            risk_score: 0.0,
        })
    }

    #[test]
    fn stores_and_reads_back_records() {
        let repo = SqliteParcelRepository::open_in_memory().expect("db");
        let stored = repo.insert(scored("Iowa", "Story", 25.0)).expect("insert");
        let fetched = repo.fetch(stored.id).expect("fetch").expect("present");
        assert_eq!(fetched, stored);
        assert_eq!(fetched.metrics.las_score, 50.0);
        assert!(repo.fetch(stored.id + 1).expect("fetch").is_none());
    }

    #[test]
    fn batch_insert_is_all_or_nothing() {
        let repo = SqliteParcelRepository::open_in_memory().expect("db");
        let mut broken = scored("Iowa", "Story", 10.0);
        broken.metrics.las_score = f64::NAN;
        // SQLite stores NaN as NULL, which the NOT NULL constraint rejects.
        let result = repo.insert_batch(vec![scored("Iowa", "Polk", 10.0), broken]);
        assert!(result.is_err());
        assert!(repo.list().expect("list").is_empty());
    }

    #[test]
    fn update_delete_and_reset() {
        let repo = SqliteParcelRepository::open_in_memory().expect("db");
        let first = repo.insert(scored("Iowa", "Story", 10.0)).expect("insert");
        repo.insert(scored("Iowa", "Polk", 40.0)).expect("insert");

        let updated = repo
            .update(first.id, scored("Iowa", "Story", 60.0))
            .expect("update");
        assert_eq!(updated.metrics.las_score, 120.0);
        assert_eq!(repo.top(1).expect("top")[0].id, first.id);

        repo.delete(first.id).expect("delete");
        assert!(matches!(repo.delete(first.id), Err(RepositoryError::NotFound)));
        assert!(matches!(
            repo.update(first.id, scored("Iowa", "Story", 1.0)),
            Err(RepositoryError::NotFound)
        ));
        assert_eq!(repo.reset().expect("reset"), 1);
    }

    #[test]
    fn county_stats_filter_by_state() {
        let repo = SqliteParcelRepository::open_in_memory().expect("db");
        repo.insert(scored("Iowa", "Story", 10.0)).expect("insert");
        repo.insert(scored("Iowa", "Story", 30.0)).expect("insert");
        repo.insert(scored("Michigan", "Clare", 50.0)).expect("insert");

        let all = repo.county_stats(None).expect("stats");
        assert_eq!(all[0].county, "Clare");
        assert_eq!(all[1].parcel_count, 2);
        assert_eq!(all[1].avg_las_score, 40.0);

        let iowa = repo.county_stats(Some("Iowa")).expect("stats");
        assert_eq!(iowa.len(), 1);
        assert_eq!(iowa[0].total_expected_year1_payout, 400.0);
    }
}
