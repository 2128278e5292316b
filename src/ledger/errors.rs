use thiserror::Error;

use crate::catalog::CatalogError;
use crate::standings::StandingsError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown match: {0}")]
    MatchUnknown(String),

    /// The match is locked or finished; predictions can no longer change.
    #[error("voting is closed for match {0}")]
    VotingClosed(String),

    #[error("no prediction by user {user_id} for match {match_id}")]
    NoPrediction { user_id: String, match_id: String },

    #[error("repository error: {0}")]
    Repository(String),
}

impl From<CatalogError> for LedgerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MatchUnknown(id) => LedgerError::MatchUnknown(id),
            other => LedgerError::Repository(other.to_string()),
        }
    }
}

impl From<StandingsError> for LedgerError {
    fn from(err: StandingsError) -> Self {
        LedgerError::Repository(err.to_string())
    }
}
