use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::location::{normalize_county, normalize_state};

/// Columns every schedule must carry to be indexed.
pub const LOCATION_COLUMNS: [&str; 2] = ["state", "county"];

/// A schedule row that can be indexed by location.
pub trait ScheduleRow: DeserializeOwned + Clone + Send + Sync {
    fn state(&self) -> &str;
    fn county(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("failed to open schedule {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid schedule CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("schedule is missing columns: {0:?}")]
    MissingColumns(Vec<&'static str>),
}

/// Payment schedule rows indexed by normalized `(state, county)`.
#[derive(Debug, Clone)]
pub struct PaymentSchedule<R> {
    rows: BTreeMap<(String, String), Vec<R>>,
}

impl<R> Default for PaymentSchedule<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<R: ScheduleRow> PaymentSchedule<R> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = R>) -> Self {
        let mut schedule = Self::empty();
        for row in rows {
            schedule.push(row);
        }
        schedule
    }

    /// Reads a CSV whose headers are matched after trimming and lowercasing. Rows that
    /// fail to deserialize are skipped with a warning.
    pub fn from_reader<T: Read>(reader: T) -> Result<Self, ScheduleError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: csv::StringRecord = csv_reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_lowercase())
            .collect();
        let missing: Vec<&'static str> = LOCATION_COLUMNS
            .into_iter()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .collect();
        if !missing.is_empty() {
            return Err(ScheduleError::MissingColumns(missing));
        }

        let mut schedule = Self::empty();
        for (index, record) in csv_reader.records().enumerate() {
            let row = record
                .map_err(ScheduleError::from)
                .and_then(|record| Ok(record.deserialize::<R>(Some(&headers))?));
            match row {
                Ok(row) => schedule.push(row),
                Err(err) => warn!(line = index + 2, error = %err, "skipping schedule row"),
            }
        }
        Ok(schedule)
    }

    pub fn from_path(path: &Path) -> Result<Self, ScheduleError> {
        let file = File::open(path).map_err(|source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Loads the schedule at `path`, degrading to an empty schedule when it is unusable.
    pub fn load(path: &Path, label: &str) -> Self {
        match Self::from_path(path) {
            Ok(schedule) => {
                info!(
                    program = label,
                    path = %path.display(),
                    rows = schedule.len(),
                    "payment schedule loaded"
                );
                schedule
            }
            Err(err) => {
                warn!(
                    program = label,
                    path = %path.display(),
                    error = %err,
                    "payment schedule unavailable; quotes will be empty"
                );
                Self::empty()
            }
        }
    }

    pub fn push(&mut self, row: R) {
        let key = (normalize_state(row.state()), normalize_county(row.county()));
        self.rows.entry(key).or_default().push(row);
    }

    /// Rows for a location given in any supported spelling (`MI`/`Michigan`,
    /// `Clare`/`Clare County`).
    pub fn rows_for(&self, state: &str, county: &str) -> &[R] {
        self.rows
            .get(&(normalize_state(state), normalize_county(county)))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Distinct county names for a state as written in the schedule, sorted.
    pub fn counties_for(&self, state: &str) -> Vec<String> {
        let state = normalize_state(state);
        self.rows
            .iter()
            .filter(|((row_state, _), _)| *row_state == state)
            .flat_map(|(_, rows)| rows.iter().map(|row| row.county().trim().to_string()))
            .filter(|county| !county.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One CRP rental-rate line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrpScheduleRow {
    pub state: String,
    pub county: String,
    pub crp_practice_code: String,
    pub crp_practice_name: String,
    pub base_rental_rate: String,
    pub contract_length_years: String,
}

impl ScheduleRow for CrpScheduleRow {
    fn state(&self) -> &str {
        &self.state
    }

    fn county(&self) -> &str {
        &self.county
    }
}

/// One EQIP or CSP payment scenario line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostShareScheduleRow {
    pub state: String,
    pub county: String,
    pub practice_code: String,
    pub scenario_code: String,
    pub scenario_name: String,
    pub unit: String,
    pub payment_type: String,
    pub unit_rate: String,
}

impl ScheduleRow for CostShareScheduleRow {
    fn state(&self) -> &str {
        &self.state
    }

    fn county(&self) -> &str {
        &self.county
    }
}
