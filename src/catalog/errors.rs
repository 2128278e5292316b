use thiserror::Error;

use super::models::Outcome;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown match: {0}")]
    MatchUnknown(String),

    /// A match was reported finished twice with two different outcomes.
    /// Data-integrity violation; the stored outcome is never overwritten.
    #[error("match {match_id} already finished as {stored}, refusing conflicting outcome {reported}")]
    AlreadyFinishedMismatch {
        match_id: String,
        stored: Outcome,
        reported: Outcome,
    },

    #[error("repository error: {0}")]
    Repository(String),
}
