use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::errors::CatalogError;
use super::models::{MatchModel, MatchState, Outcome, Score};
use super::repository::{FinishAttempt, MatchRepository};

/// Configuration for the match catalog
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// How long before kickoff predictions stop being accepted
    pub lock_window: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            lock_window: Duration::minutes(10),
        }
    }
}

/// Tracks match identity, kickoff and lifecycle on top of a repository.
///
/// Lifecycle is partly time-derived: `state_of` reports LOCKED for any match
/// whose lock window has passed, whether or not the lock sweep has run yet.
pub struct CatalogService {
    repository: Arc<dyn MatchRepository>,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn MatchRepository>, config: CatalogConfig) -> Self {
        Self { repository, config }
    }

    /// Registers a newly observed match. Idempotent: a duplicate id is a
    /// silent no-op and never touches lifecycle state or outcome.
    /// Returns true when the match was previously unknown.
    #[instrument(skip(self, m), fields(match_id = %m.id))]
    pub async fn register(&self, m: MatchModel) -> Result<bool, CatalogError> {
        let inserted = self.repository.insert_if_absent(&m).await?;
        if inserted {
            info!(
                match_id = %m.id,
                home = %m.home_team,
                away = %m.away_team,
                kickoff = %m.kickoff,
                "Registered new match"
            );
        }
        Ok(inserted)
    }

    pub async fn get(&self, match_id: &str) -> Result<Option<MatchModel>, CatalogError> {
        self.repository.get(match_id).await
    }

    /// Lifecycle state of a match at `now`. Fails with `MatchUnknown` for
    /// unregistered ids.
    pub async fn lifecycle_state(
        &self,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> Result<MatchState, CatalogError> {
        let m = self
            .repository
            .get(match_id)
            .await?
            .ok_or_else(|| CatalogError::MatchUnknown(match_id.to_string()))?;
        Ok(self.state_of(&m, now))
    }

    /// Time-derived lifecycle state. The boundary instant `kickoff −
    /// lock_window` is LOCKED, not open.
    pub fn state_of(&self, m: &MatchModel, now: DateTime<Utc>) -> MatchState {
        match m.state {
            MatchState::Finished => MatchState::Finished,
            MatchState::Locked => MatchState::Locked,
            MatchState::Scheduled => {
                if now >= m.kickoff - self.config.lock_window {
                    MatchState::Locked
                } else {
                    MatchState::Scheduled
                }
            }
        }
    }

    /// Transitions a match to FINISHED with its outcome and optional score.
    /// Repeating the call with the same outcome is a no-op; a different
    /// outcome fails with `AlreadyFinishedMismatch`.
    #[instrument(skip(self))]
    pub async fn mark_finished(
        &self,
        match_id: &str,
        outcome: Outcome,
        score: Option<Score>,
    ) -> Result<MatchModel, CatalogError> {
        match self.repository.try_finish(match_id, outcome, score).await? {
            FinishAttempt::Finished(m) => {
                info!(match_id = %match_id, outcome = %outcome, "Match finished");
                Ok(m)
            }
            FinishAttempt::AlreadyFinished(m) => {
                debug!(match_id = %match_id, "Match already finished with the same outcome");
                Ok(m)
            }
            FinishAttempt::OutcomeMismatch { stored, reported } => {
                Err(CatalogError::AlreadyFinishedMismatch {
                    match_id: match_id.to_string(),
                    stored,
                    reported,
                })
            }
            FinishAttempt::NotFound => Err(CatalogError::MatchUnknown(match_id.to_string())),
        }
    }

    /// Marks every SCHEDULED match whose lock window has passed as LOCKED.
    /// Returns how many matches were locked.
    #[instrument(skip(self))]
    pub async fn sweep_locks(&self, now: DateTime<Utc>) -> Result<usize, CatalogError> {
        let scheduled = self.repository.list_in_state(MatchState::Scheduled).await?;

        let mut locked = 0;
        for m in scheduled {
            if now >= m.kickoff - self.config.lock_window
                && self.repository.mark_locked(&m.id).await?
            {
                info!(match_id = %m.id, kickoff = %m.kickoff, "Locked match ahead of kickoff");
                locked += 1;
            }
        }

        Ok(locked)
    }
}
