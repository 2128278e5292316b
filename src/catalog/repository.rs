use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::errors::CatalogError;
use super::models::{MatchModel, MatchState, Outcome, Score};

/// Result of attempting to finish a match
#[derive(Debug, Clone)]
pub enum FinishAttempt {
    /// Match transitioned to FINISHED, returns updated match data
    Finished(MatchModel),
    /// Match was already finished with the same outcome, no-op
    AlreadyFinished(MatchModel),
    /// Match was already finished with a different outcome
    OutcomeMismatch { stored: Outcome, reported: Outcome },
    /// Match does not exist
    NotFound,
}

/// Trait for match catalog storage operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Inserts a match if its id is unknown. Returns false (and changes
    /// nothing, including lifecycle state) when the id already exists.
    async fn insert_if_absent(&self, m: &MatchModel) -> Result<bool, CatalogError>;

    async fn get(&self, match_id: &str) -> Result<Option<MatchModel>, CatalogError>;

    async fn list_in_state(&self, state: MatchState) -> Result<Vec<MatchModel>, CatalogError>;

    /// Marks a SCHEDULED match as LOCKED. Returns false if the match is
    /// missing or already past SCHEDULED.
    async fn mark_locked(&self, match_id: &str) -> Result<bool, CatalogError>;

    /// Atomically transitions a match to FINISHED, refusing to overwrite a
    /// previously stored outcome with a different one.
    async fn try_finish(
        &self,
        match_id: &str,
        outcome: Outcome,
        score: Option<Score>,
    ) -> Result<FinishAttempt, CatalogError>;
}

/// In-memory implementation of MatchRepository for development and testing
pub struct InMemoryMatchRepository {
    matches: Mutex<HashMap<String, MatchModel>>,
}

impl Default for InMemoryMatchRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self {
            matches: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    #[instrument(skip(self, m))]
    async fn insert_if_absent(&self, m: &MatchModel) -> Result<bool, CatalogError> {
        let mut matches = self.matches.lock().unwrap();
        if matches.contains_key(&m.id) {
            debug!(match_id = %m.id, "Match already registered, skipping");
            return Ok(false);
        }
        matches.insert(m.id.clone(), m.clone());

        debug!(match_id = %m.id, home = %m.home_team, away = %m.away_team, "Match registered in memory");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn get(&self, match_id: &str) -> Result<Option<MatchModel>, CatalogError> {
        let matches = self.matches.lock().unwrap();
        Ok(matches.get(match_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_in_state(&self, state: MatchState) -> Result<Vec<MatchModel>, CatalogError> {
        let matches = self.matches.lock().unwrap();
        Ok(matches.values().filter(|m| m.state == state).cloned().collect())
    }

    #[instrument(skip(self))]
    async fn mark_locked(&self, match_id: &str) -> Result<bool, CatalogError> {
        let mut matches = self.matches.lock().unwrap();
        match matches.get_mut(match_id) {
            Some(m) if m.state == MatchState::Scheduled => {
                m.state = MatchState::Locked;
                debug!(match_id = %match_id, "Match locked in memory");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn try_finish(
        &self,
        match_id: &str,
        outcome: Outcome,
        score: Option<Score>,
    ) -> Result<FinishAttempt, CatalogError> {
        let mut matches = self.matches.lock().unwrap();

        let m = match matches.get_mut(match_id) {
            Some(m) => m,
            None => {
                debug!(match_id = %match_id, "Match not found for finish");
                return Ok(FinishAttempt::NotFound);
            }
        };

        if let Some(stored) = m.outcome {
            if stored == outcome {
                return Ok(FinishAttempt::AlreadyFinished(m.clone()));
            }
            warn!(
                match_id = %match_id,
                stored = %stored,
                reported = %outcome,
                "Refusing to overwrite stored outcome"
            );
            return Ok(FinishAttempt::OutcomeMismatch {
                stored,
                reported: outcome,
            });
        }

        m.state = MatchState::Finished;
        m.outcome = Some(outcome);
        m.score = score;

        debug!(match_id = %match_id, outcome = %outcome, "Match finished in memory");
        Ok(FinishAttempt::Finished(m.clone()))
    }
}

/// PostgreSQL implementation of the match repository
pub struct PostgresMatchRepository {
    pool: PgPool,
}

impl PostgresMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_match(row: &sqlx::postgres::PgRow) -> Result<MatchModel, CatalogError> {
        let state: String = row.get("state");
        let outcome: Option<String> = row.get("outcome");
        let home_score: Option<i32> = row.get("home_score");
        let away_score: Option<i32> = row.get("away_score");

        let score = match (home_score, away_score) {
            (Some(home), Some(away)) => Some(Score::new(home as u32, away as u32)),
            _ => None,
        };

        Ok(MatchModel {
            id: row.get("id"),
            home_team: row.get("home_team"),
            away_team: row.get("away_team"),
            competition: row.get("competition"),
            kickoff: row.get("kickoff"),
            state: state
                .parse()
                .map_err(|_| CatalogError::Repository(format!("bad state column: {state}")))?,
            outcome: outcome
                .map(|o| {
                    o.parse().map_err(|_| {
                        CatalogError::Repository(format!("bad outcome column: {o}"))
                    })
                })
                .transpose()?,
            score,
        })
    }
}

#[async_trait]
impl MatchRepository for PostgresMatchRepository {
    #[instrument(skip(self, m))]
    async fn insert_if_absent(&self, m: &MatchModel) -> Result<bool, CatalogError> {
        let result = sqlx::query(
            "INSERT INTO matches (id, home_team, away_team, competition, kickoff, state) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&m.id)
        .bind(&m.home_team)
        .bind(&m.away_team)
        .bind(&m.competition)
        .bind(m.kickoff)
        .bind(m.state.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_id = %m.id, "Failed to register match in database");
            CatalogError::Repository(e.to_string())
        })?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn get(&self, match_id: &str) -> Result<Option<MatchModel>, CatalogError> {
        let row = sqlx::query(
            "SELECT id, home_team, away_team, competition, kickoff, state, outcome, \
             home_score, away_score FROM matches WHERE id = $1",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Repository(e.to_string()))?;

        row.as_ref().map(Self::row_to_match).transpose()
    }

    #[instrument(skip(self))]
    async fn list_in_state(&self, state: MatchState) -> Result<Vec<MatchModel>, CatalogError> {
        let rows = sqlx::query(
            "SELECT id, home_team, away_team, competition, kickoff, state, outcome, \
             home_score, away_score FROM matches WHERE state = $1",
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CatalogError::Repository(e.to_string()))?;

        rows.iter().map(Self::row_to_match).collect()
    }

    #[instrument(skip(self))]
    async fn mark_locked(&self, match_id: &str) -> Result<bool, CatalogError> {
        let result = sqlx::query(
            "UPDATE matches SET state = 'LOCKED' WHERE id = $1 AND state = 'SCHEDULED'",
        )
        .bind(match_id)
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Repository(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn try_finish(
        &self,
        match_id: &str,
        outcome: Outcome,
        score: Option<Score>,
    ) -> Result<FinishAttempt, CatalogError> {
        // Guarded update: only fires when no conflicting outcome is stored.
        let result = sqlx::query(
            "UPDATE matches SET state = 'FINISHED', outcome = $2, home_score = $3, away_score = $4 \
             WHERE id = $1 AND (outcome IS NULL OR outcome = $2)",
        )
        .bind(match_id)
        .bind(outcome.to_string())
        .bind(score.map(|s| s.home as i32))
        .bind(score.map(|s| s.away as i32))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_id = %match_id, "Failed to finish match in database");
            CatalogError::Repository(e.to_string())
        })?;

        let current = self.get(match_id).await?;
        match current {
            None => Ok(FinishAttempt::NotFound),
            Some(m) => {
                if result.rows_affected() == 1 {
                    Ok(FinishAttempt::Finished(m))
                } else {
                    match m.outcome {
                        Some(stored) if stored != outcome => Ok(FinishAttempt::OutcomeMismatch {
                            stored,
                            reported: outcome,
                        }),
                        _ => Ok(FinishAttempt::AlreadyFinished(m)),
                    }
                }
            }
        }
    }
}
