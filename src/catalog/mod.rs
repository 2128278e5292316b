// Public API - what other modules can use
pub use errors::CatalogError;
pub use models::{MatchModel, MatchState, Outcome, Score};
pub use repository::{FinishAttempt, InMemoryMatchRepository, MatchRepository};
pub use service::{CatalogConfig, CatalogService};

// Internal modules
mod errors;
pub mod models;
pub mod repository;
pub mod service;
