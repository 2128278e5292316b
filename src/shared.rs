use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{CatalogError, CatalogService};
use crate::ledger::{LedgerError, LedgerService};
use crate::standings::{LeaderboardProjector, StandingsError, UserRepository};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub ledger: Arc<LedgerService>,
    pub leaderboard: Arc<LeaderboardProjector>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogService>,
        ledger: Arc<LedgerService>,
        leaderboard: Arc<LeaderboardProjector>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            leaderboard,
            users,
        }
    }
}

/// Errors crossing the HTTP boundary. Domain errors convert into this and
/// map onto status codes; the poll tasks log their failures and never
/// surface here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("unknown match: {0}")]
    MatchUnknown(String),

    #[error("voting is closed for match {0}")]
    VotingClosed(String),

    #[error("no prediction by user {user_id} for match {match_id}")]
    NoPrediction { user_id: String, match_id: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::MatchUnknown(id) => AppError::MatchUnknown(id),
            LedgerError::VotingClosed(id) => AppError::VotingClosed(id),
            LedgerError::NoPrediction { user_id, match_id } => {
                AppError::NoPrediction { user_id, match_id }
            }
            LedgerError::Repository(msg) => AppError::Storage(msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MatchUnknown(id) => AppError::MatchUnknown(id),
            CatalogError::AlreadyFinishedMismatch { .. } => AppError::Conflict(err.to_string()),
            CatalogError::Repository(msg) => AppError::Storage(msg),
        }
    }
}

impl From<StandingsError> for AppError {
    fn from(err: StandingsError) -> Self {
        match err {
            StandingsError::UserUnknown(id) => AppError::NotFound(format!("user {id}")),
            StandingsError::Repository(msg) => AppError::Storage(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MatchUnknown(_) | AppError::NoPrediction { .. } | AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::VotingClosed(_) | AppError::Conflict(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Storage(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {}", msg),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::catalog::{CatalogConfig, InMemoryMatchRepository};
    use crate::ledger::InMemoryPredictionRepository;
    use crate::standings::InMemoryUserRepository;

    /// Builder for a fully in-memory AppState with config overrides
    pub struct AppStateBuilder {
        catalog_config: CatalogConfig,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                catalog_config: CatalogConfig::default(),
            }
        }

        pub fn with_lock_window(mut self, lock_window: chrono::Duration) -> Self {
            self.catalog_config.lock_window = lock_window;
            self
        }

        pub fn build(self) -> AppState {
            let catalog = Arc::new(CatalogService::new(
                Arc::new(InMemoryMatchRepository::new()),
                self.catalog_config,
            ));
            let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
            let ledger = Arc::new(LedgerService::new(
                Arc::new(InMemoryPredictionRepository::new()),
                users.clone(),
                catalog.clone(),
            ));
            let leaderboard = Arc::new(LeaderboardProjector::new(users.clone()));

            AppState::new(catalog, ledger, leaderboard, users)
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
