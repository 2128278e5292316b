// Public API - what other modules can use
pub use errors::ScoringError;
pub use models::ScoringResult;
pub use processed::{InMemoryProcessedMatches, ProcessedMatches};
pub use service::{ScoringConfig, ScoringService};

// Internal modules
mod errors;
pub mod models;
pub mod processed;
pub mod service;
