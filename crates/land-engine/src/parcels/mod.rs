//! Parcel record store: validated inputs, LAS scoring, persistence and CSV import/ranking.

mod csv_io;
mod domain;
mod memory;
mod metrics;
mod repository;
mod router;
mod service;
mod sqlite;

pub use csv_io::{
    rank_csv, read_parcels, CsvParcelRow, ParcelCsvError, ParsedParcels, RankedCsv,
    REQUIRED_HEADERS,
};
pub use domain::{
    CountyStats, ParcelId, ParcelInput, ParcelRecord, ParcelUpdate, ParcelValidationError,
    ScoredParcel,
};
pub use memory::InMemoryParcelRepository;
pub use metrics::{round_cents, ParcelMetrics};
pub use repository::{ParcelRepository, RepositoryError};
pub use router::parcel_router;
pub use service::{ParcelService, ParcelServiceError, MAX_TOP_LIMIT};
pub use sqlite::SqliteParcelRepository;
