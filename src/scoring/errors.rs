use thiserror::Error;

use crate::catalog::CatalogError;
use crate::ledger::LedgerError;
use crate::standings::StandingsError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("unknown match: {0}")]
    MatchUnknown(String),

    #[error("repository error: {0}")]
    Repository(String),
}

impl From<CatalogError> for ScoringError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MatchUnknown(id) => ScoringError::MatchUnknown(id),
            other => ScoringError::Repository(other.to_string()),
        }
    }
}

impl From<LedgerError> for ScoringError {
    fn from(err: LedgerError) -> Self {
        ScoringError::Repository(err.to_string())
    }
}

impl From<StandingsError> for ScoringError {
    fn from(err: StandingsError) -> Self {
        ScoringError::Repository(err.to_string())
    }
}
