use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::errors::LedgerError;
use super::models::PredictionModel;
use crate::catalog::Outcome;

/// Trait for prediction storage operations
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Creates or replaces the prediction for (user, match), returning the
    /// previous choice if one existed. Atomic per (user, match) pair.
    async fn upsert(&self, p: &PredictionModel) -> Result<Option<Outcome>, LedgerError>;

    /// Deletes and returns the prediction for (user, match), if any.
    async fn remove(
        &self,
        user_id: &str,
        match_id: &str,
    ) -> Result<Option<PredictionModel>, LedgerError>;

    async fn get(
        &self,
        user_id: &str,
        match_id: &str,
    ) -> Result<Option<PredictionModel>, LedgerError>;

    async fn for_match(&self, match_id: &str) -> Result<Vec<PredictionModel>, LedgerError>;

    async fn for_user(&self, user_id: &str) -> Result<Vec<PredictionModel>, LedgerError>;
}

/// In-memory implementation of PredictionRepository for development and testing
pub struct InMemoryPredictionRepository {
    predictions: Mutex<HashMap<(String, String), PredictionModel>>,
}

impl Default for InMemoryPredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            predictions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored predictions, across all matches
    pub fn prediction_count(&self) -> usize {
        self.predictions.lock().unwrap().len()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    #[instrument(skip(self, p), fields(user_id = %p.user_id, match_id = %p.match_id))]
    async fn upsert(&self, p: &PredictionModel) -> Result<Option<Outcome>, LedgerError> {
        let mut predictions = self.predictions.lock().unwrap();
        let key = (p.user_id.clone(), p.match_id.clone());
        let previous = predictions.insert(key, p.clone()).map(|old| old.choice);

        debug!(
            user_id = %p.user_id,
            match_id = %p.match_id,
            choice = %p.choice,
            replaced = previous.is_some(),
            "Prediction stored in memory"
        );
        Ok(previous)
    }

    #[instrument(skip(self))]
    async fn remove(
        &self,
        user_id: &str,
        match_id: &str,
    ) -> Result<Option<PredictionModel>, LedgerError> {
        let mut predictions = self.predictions.lock().unwrap();
        let removed = predictions.remove(&(user_id.to_string(), match_id.to_string()));

        match &removed {
            Some(p) => debug!(user_id = %user_id, match_id = %match_id, choice = %p.choice, "Prediction removed from memory"),
            None => debug!(user_id = %user_id, match_id = %match_id, "No prediction to remove"),
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn get(
        &self,
        user_id: &str,
        match_id: &str,
    ) -> Result<Option<PredictionModel>, LedgerError> {
        let predictions = self.predictions.lock().unwrap();
        Ok(predictions
            .get(&(user_id.to_string(), match_id.to_string()))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn for_match(&self, match_id: &str) -> Result<Vec<PredictionModel>, LedgerError> {
        let predictions = self.predictions.lock().unwrap();
        Ok(predictions
            .values()
            .filter(|p| p.match_id == match_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn for_user(&self, user_id: &str) -> Result<Vec<PredictionModel>, LedgerError> {
        let predictions = self.predictions.lock().unwrap();
        Ok(predictions
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation of the prediction repository
pub struct PostgresPredictionRepository {
    pool: PgPool,
}

impl PostgresPredictionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_prediction(row: &sqlx::postgres::PgRow) -> Result<PredictionModel, LedgerError> {
        let choice: String = row.get("choice");
        Ok(PredictionModel {
            user_id: row.get("user_id"),
            match_id: row.get("match_id"),
            choice: choice
                .parse()
                .map_err(|_| LedgerError::Repository(format!("bad choice column: {choice}")))?,
            submitted_at: row.get("submitted_at"),
        })
    }
}

#[async_trait]
impl PredictionRepository for PostgresPredictionRepository {
    #[instrument(skip(self, p), fields(user_id = %p.user_id, match_id = %p.match_id))]
    async fn upsert(&self, p: &PredictionModel) -> Result<Option<Outcome>, LedgerError> {
        // The CTE snapshots the old choice before the upsert touches the row
        let row = sqlx::query(
            "WITH previous AS ( \
                 SELECT choice FROM predictions WHERE user_id = $1 AND match_id = $2 \
             ) \
             INSERT INTO predictions (user_id, match_id, choice, submitted_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, match_id) \
             DO UPDATE SET choice = EXCLUDED.choice, submitted_at = EXCLUDED.submitted_at \
             RETURNING (SELECT choice FROM previous) AS previous_choice",
        )
        .bind(&p.user_id)
        .bind(&p.match_id)
        .bind(p.choice.to_string())
        .bind(p.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %p.user_id, match_id = %p.match_id, "Failed to upsert prediction");
            LedgerError::Repository(e.to_string())
        })?;

        let previous: Option<String> = row.get("previous_choice");
        previous
            .map(|c| {
                c.parse()
                    .map_err(|_| LedgerError::Repository(format!("bad choice column: {c}")))
            })
            .transpose()
    }

    #[instrument(skip(self))]
    async fn remove(
        &self,
        user_id: &str,
        match_id: &str,
    ) -> Result<Option<PredictionModel>, LedgerError> {
        let row = sqlx::query(
            "DELETE FROM predictions WHERE user_id = $1 AND match_id = $2 \
             RETURNING user_id, match_id, choice, submitted_at",
        )
        .bind(user_id)
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Repository(e.to_string()))?;

        row.as_ref().map(Self::row_to_prediction).transpose()
    }

    #[instrument(skip(self))]
    async fn get(
        &self,
        user_id: &str,
        match_id: &str,
    ) -> Result<Option<PredictionModel>, LedgerError> {
        let row = sqlx::query(
            "SELECT user_id, match_id, choice, submitted_at FROM predictions \
             WHERE user_id = $1 AND match_id = $2",
        )
        .bind(user_id)
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Repository(e.to_string()))?;

        row.as_ref().map(Self::row_to_prediction).transpose()
    }

    #[instrument(skip(self))]
    async fn for_match(&self, match_id: &str) -> Result<Vec<PredictionModel>, LedgerError> {
        let rows = sqlx::query(
            "SELECT user_id, match_id, choice, submitted_at FROM predictions WHERE match_id = $1",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Repository(e.to_string()))?;

        rows.iter().map(Self::row_to_prediction).collect()
    }

    #[instrument(skip(self))]
    async fn for_user(&self, user_id: &str) -> Result<Vec<PredictionModel>, LedgerError> {
        let rows = sqlx::query(
            "SELECT user_id, match_id, choice, submitted_at FROM predictions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Repository(e.to_string()))?;

        rows.iter().map(Self::row_to_prediction).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn prediction(user_id: &str, match_id: &str, choice: Outcome) -> PredictionModel {
        PredictionModel {
            user_id: user_id.to_string(),
            match_id: match_id.to_string(),
            choice,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_reports_previous_choice() {
        let repo = InMemoryPredictionRepository::new();

        let previous = repo.upsert(&prediction("u1", "m1", Outcome::Home)).await.unwrap();
        assert_eq!(previous, None);

        let previous = repo.upsert(&prediction("u1", "m1", Outcome::Draw)).await.unwrap();
        assert_eq!(previous, Some(Outcome::Home));
    }

    #[tokio::test]
    async fn repeated_votes_keep_a_single_row_per_pair() {
        let repo = InMemoryPredictionRepository::new();

        for choice in [Outcome::Home, Outcome::Draw, Outcome::Away, Outcome::Home] {
            repo.upsert(&prediction("u1", "m1", choice)).await.unwrap();
        }

        assert_eq!(repo.prediction_count(), 1);
        let stored = repo.get("u1", "m1").await.unwrap().unwrap();
        assert_eq!(stored.choice, Outcome::Home);
    }

    #[tokio::test]
    async fn remove_returns_the_deleted_prediction() {
        let repo = InMemoryPredictionRepository::new();
        repo.upsert(&prediction("u1", "m1", Outcome::Away)).await.unwrap();

        let removed = repo.remove("u1", "m1").await.unwrap().unwrap();
        assert_eq!(removed.choice, Outcome::Away);

        assert!(repo.remove("u1", "m1").await.unwrap().is_none());
        assert!(repo.get("u1", "m1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn for_match_and_for_user_filter_correctly() {
        let repo = InMemoryPredictionRepository::new();
        repo.upsert(&prediction("u1", "m1", Outcome::Home)).await.unwrap();
        repo.upsert(&prediction("u2", "m1", Outcome::Draw)).await.unwrap();
        repo.upsert(&prediction("u1", "m2", Outcome::Away)).await.unwrap();

        let for_match = repo.for_match("m1").await.unwrap();
        assert_eq!(for_match.len(), 2);

        let for_user = repo.for_user("u1").await.unwrap();
        assert_eq!(for_user.len(), 2);
        assert!(for_user.iter().all(|p| p.user_id == "u1"));
    }
}
