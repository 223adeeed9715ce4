use super::domain::{CountyStats, ParcelId, ParcelRecord, ScoredParcel};

/// Storage abstraction so the service can be exercised without a database.
pub trait ParcelRepository: Send + Sync {
    fn insert(&self, parcel: ScoredParcel) -> Result<ParcelRecord, RepositoryError>;
    /// Stores every parcel or none of them.
    fn insert_batch(&self, parcels: Vec<ScoredParcel>)
        -> Result<Vec<ParcelRecord>, RepositoryError>;
    fn fetch(&self, id: ParcelId) -> Result<Option<ParcelRecord>, RepositoryError>;
    /// All parcels, ascending by id.
    fn list(&self) -> Result<Vec<ParcelRecord>, RepositoryError>;
    /// Highest LAS score first; ties go to the older parcel.
    fn top(&self, limit: usize) -> Result<Vec<ParcelRecord>, RepositoryError>;
    fn update(&self, id: ParcelId, parcel: ScoredParcel) -> Result<ParcelRecord, RepositoryError>;
    fn delete(&self, id: ParcelId) -> Result<(), RepositoryError>;
    /// Removes every parcel and returns how many were removed.
    fn reset(&self) -> Result<usize, RepositoryError>;
    /// Per-county aggregates, best average LAS first, optionally for one state.
    fn county_stats(&self, state: Option<&str>) -> Result<Vec<CountyStats>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("parcel not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
