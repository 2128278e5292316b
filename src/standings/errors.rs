use thiserror::Error;

#[derive(Debug, Error)]
pub enum StandingsError {
    #[error("unknown user: {0}")]
    UserUnknown(String),

    #[error("repository error: {0}")]
    Repository(String),
}
