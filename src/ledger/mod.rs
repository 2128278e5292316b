// Public API - what other modules can use
pub use errors::LedgerError;
pub use handlers::{match_tally, submit_prediction, withdraw_prediction};
pub use models::{MatchTally, PredictionModel, VoteReceipt};
pub use repository::{InMemoryPredictionRepository, PredictionRepository};
pub use service::LedgerService;
pub use types::{VoteRequest, VoteResponse, WithdrawRequest};

// Internal modules
mod errors;
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
mod types;
