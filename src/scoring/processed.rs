use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::errors::ScoringError;

/// The set of match ids that have already had points awarded.
///
/// This is the one place the "has this match been scored" question is
/// answered; `try_mark` is an atomic check-and-set so the answer can never
/// race with itself.
#[async_trait]
pub trait ProcessedMatches: Send + Sync {
    /// Marks the match as processed. Returns false if it already was.
    async fn try_mark(&self, match_id: &str) -> Result<bool, ScoringError>;

    async fn contains(&self, match_id: &str) -> Result<bool, ScoringError>;
}

/// In-memory implementation of ProcessedMatches for development and testing
pub struct InMemoryProcessedMatches {
    marked: Mutex<HashSet<String>>,
}

impl Default for InMemoryProcessedMatches {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProcessedMatches {
    pub fn new() -> Self {
        Self {
            marked: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl ProcessedMatches for InMemoryProcessedMatches {
    #[instrument(skip(self))]
    async fn try_mark(&self, match_id: &str) -> Result<bool, ScoringError> {
        let mut marked = self.marked.lock().unwrap();
        let inserted = marked.insert(match_id.to_string());
        debug!(match_id = %match_id, newly_marked = inserted, "Processed marker updated");
        Ok(inserted)
    }

    #[instrument(skip(self))]
    async fn contains(&self, match_id: &str) -> Result<bool, ScoringError> {
        let marked = self.marked.lock().unwrap();
        Ok(marked.contains(match_id))
    }
}

/// PostgreSQL implementation backed by a primary-key insert; the conflict
/// clause makes the check-and-set atomic across processes.
pub struct PostgresProcessedMatches {
    pool: PgPool,
}

impl PostgresProcessedMatches {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedMatches for PostgresProcessedMatches {
    #[instrument(skip(self))]
    async fn try_mark(&self, match_id: &str) -> Result<bool, ScoringError> {
        let result = sqlx::query(
            "INSERT INTO processed_matches (match_id) VALUES ($1) ON CONFLICT DO NOTHING",
        )
        .bind(match_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_id = %match_id, "Failed to mark match processed");
            ScoringError::Repository(e.to_string())
        })?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn contains(&self, match_id: &str) -> Result<bool, ScoringError> {
        let row = sqlx::query("SELECT 1 FROM processed_matches WHERE match_id = $1")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ScoringError::Repository(e.to_string()))?;

        Ok(row.is_some())
    }
}
