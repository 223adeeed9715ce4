//! Program scoring: GIS derivation, schedule quotes and practice filtering per parcel.

mod router;
mod scorer;

pub use router::program_router;
pub use scorer::{ParcelRequest, ProgramScorer, ScoreAllResponse, ScoringError};
