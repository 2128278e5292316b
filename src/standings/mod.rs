// Public API - what other modules can use
pub use errors::StandingsError;
pub use handlers::{leaderboard, reset_user, user_predictions};
pub use models::{LeaderboardEntry, UserStats};
pub use projector::LeaderboardProjector;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use types::UserPredictionsResponse;

// Internal modules
mod errors;
mod handlers;
pub mod models;
pub mod projector;
pub mod repository;
mod types;
