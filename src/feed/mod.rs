// Public API - what other modules can use
pub use models::{RawMatch, RawStatus};
pub use poller::{
    ingest_results, ingest_upcoming, start_lock_sweep_task, start_results_poll_task,
    start_upcoming_poll_task, PollerConfig,
};

// Internal modules
pub mod models;
pub mod poller;

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The external feed could not be reached or returned garbage. Never
    /// fatal: the poll simply retries on its next tick.
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// The sports-data collaborator, reduced to the two pulls the poller makes.
/// Production wires an HTTP-backed implementation here; tests and offline
/// runs use `StaticMatchFeed`.
#[async_trait]
pub trait MatchFeed: Send + Sync {
    /// Matches scheduled in the near future
    async fn upcoming(&self) -> Result<Vec<RawMatch>, FeedError>;

    /// Matches from the recent past, finished or not
    async fn recently_finished(&self) -> Result<Vec<RawMatch>, FeedError>;
}

/// Canned feed serving whatever records were pushed into it.
pub struct StaticMatchFeed {
    matches: Mutex<Vec<RawMatch>>,
}

impl Default for StaticMatchFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticMatchFeed {
    pub fn new() -> Self {
        Self {
            matches: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, raw: RawMatch) {
        self.matches.lock().unwrap().push(raw);
    }

    /// Replaces an earlier record with the same id, as a re-poll would
    pub fn update(&self, raw: RawMatch) {
        let mut matches = self.matches.lock().unwrap();
        matches.retain(|m| m.id != raw.id);
        matches.push(raw);
    }
}

#[async_trait]
impl MatchFeed for StaticMatchFeed {
    async fn upcoming(&self) -> Result<Vec<RawMatch>, FeedError> {
        let matches = self.matches.lock().unwrap();
        Ok(matches
            .iter()
            .filter(|m| m.status != RawStatus::Finished)
            .cloned()
            .collect())
    }

    async fn recently_finished(&self) -> Result<Vec<RawMatch>, FeedError> {
        let matches = self.matches.lock().unwrap();
        Ok(matches
            .iter()
            .filter(|m| m.status == RawStatus::Finished)
            .cloned()
            .collect())
    }
}
