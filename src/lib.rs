// Library crate for the match prediction service
// This file exposes the public API for integration tests

pub mod catalog;
pub mod feed;
pub mod ledger;
pub mod resolver;
pub mod scoring;
pub mod shared;
pub mod standings;

// Re-export commonly used types for easier access in tests
pub use catalog::{CatalogConfig, CatalogService, MatchModel, MatchState, Outcome, Score};
pub use ledger::{LedgerError, LedgerService, MatchTally, VoteReceipt};
pub use scoring::{ScoringConfig, ScoringResult, ScoringService};
pub use shared::{AppError, AppState};
pub use standings::{LeaderboardEntry, LeaderboardProjector, UserRepository};
