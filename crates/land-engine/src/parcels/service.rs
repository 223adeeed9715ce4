use std::io::Read;
use std::sync::Arc;

use tracing::info;

use super::csv_io::{self, ParcelCsvError};
use super::domain::{
    CountyStats, ParcelId, ParcelInput, ParcelRecord, ParcelUpdate, ParcelValidationError,
    ScoredParcel,
};
use super::repository::{ParcelRepository, RepositoryError};

pub const MAX_TOP_LIMIT: usize = 100;

/// Service scoring parcels and keeping them in the repository.
pub struct ParcelService<R> {
    repository: Arc<R>,
}

impl<R> ParcelService<R>
where
    R: ParcelRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(&self, input: ParcelInput) -> Result<ParcelRecord, ParcelServiceError> {
        input.validate()?;
        let record = self.repository.insert(ScoredParcel::score(input))?;
        Ok(record)
    }

    /// Validates the whole batch before storing any of it.
    pub fn create_batch(
        &self,
        inputs: Vec<ParcelInput>,
    ) -> Result<Vec<ParcelRecord>, ParcelServiceError> {
        for (index, input) in inputs.iter().enumerate() {
            input
                .validate()
                .map_err(|source| ParcelValidationError::InBatch {
                    index,
                    source: Box::new(source),
                })?;
        }
        let scored = inputs.into_iter().map(ScoredParcel::score).collect();
        Ok(self.repository.insert_batch(scored)?)
    }

    pub fn get(&self, id: ParcelId) -> Result<ParcelRecord, ParcelServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<ParcelRecord>, ParcelServiceError> {
        Ok(self.repository.list()?)
    }

    pub fn top(&self, limit: usize) -> Result<Vec<ParcelRecord>, ParcelServiceError> {
        if !(1..=MAX_TOP_LIMIT).contains(&limit) {
            return Err(ParcelServiceError::InvalidLimit(limit));
        }
        Ok(self.repository.top(limit)?)
    }

    /// Applies the update over the stored values and re-scores the merged parcel.
    pub fn update(
        &self,
        id: ParcelId,
        update: ParcelUpdate,
    ) -> Result<ParcelRecord, ParcelServiceError> {
        let current = self.get(id)?;
        let merged = update.merge_into(&current.input);
        merged.validate()?;
        Ok(self.repository.update(id, ScoredParcel::score(merged))?)
    }

    pub fn delete(&self, id: ParcelId) -> Result<(), ParcelServiceError> {
        Ok(self.repository.delete(id)?)
    }

    pub fn reset(&self) -> Result<usize, ParcelServiceError> {
        let removed = self.repository.reset()?;
        info!(removed, "parcel store reset");
        Ok(removed)
    }

    pub fn county_stats(
        &self,
        state: Option<&str>,
    ) -> Result<Vec<CountyStats>, ParcelServiceError> {
        let state = state.map(str::trim).filter(|state| !state.is_empty());
        Ok(self.repository.county_stats(state)?)
    }

    /// Stores every valid CSV row in one batch; invalid rows are skipped.
    pub fn import_csv<T: Read>(&self, reader: T) -> Result<Vec<ParcelRecord>, ParcelServiceError> {
        let parsed = csv_io::read_parcels(reader)?;
        if parsed.rows.is_empty() {
            return Err(ParcelCsvError::NoValidRows.into());
        }
        let scored = parsed
            .rows
            .into_iter()
            .map(|row| ScoredParcel::score(row.input))
            .collect();
        let records = self.repository.insert_batch(scored)?;
        info!(
            imported = records.len(),
            skipped = parsed.skipped,
            "parcel CSV imported"
        );
        Ok(records)
    }
}

/// Error raised by the parcel service.
#[derive(Debug, thiserror::Error)]
pub enum ParcelServiceError {
    #[error(transparent)]
    Validation(#[from] ParcelValidationError),
    #[error("limit must be between 1 and {MAX_TOP_LIMIT} (got {0})")]
    InvalidLimit(usize),
    #[error(transparent)]
    Csv(#[from] ParcelCsvError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
