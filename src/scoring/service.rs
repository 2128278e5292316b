use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, instrument};

use super::errors::ScoringError;
use super::models::ScoringResult;
use super::processed::ProcessedMatches;
use crate::catalog::{CatalogService, MatchState};
use crate::ledger::PredictionRepository;
use crate::standings::UserRepository;

/// Configuration for the scoring engine
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Points a correct prediction is worth. Defaults to 3, the value the
    /// weekly summaries divide by.
    pub points_per_correct: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points_per_correct: 3,
        }
    }
}

/// Awards points for a finished match exactly once, however often and from
/// however many tasks it is asked to.
pub struct ScoringService {
    catalog: Arc<CatalogService>,
    predictions: Arc<dyn PredictionRepository>,
    users: Arc<dyn UserRepository>,
    processed: Arc<dyn ProcessedMatches>,
    config: ScoringConfig,
    match_mutexes: RwLock<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ScoringService {
    pub fn new(
        catalog: Arc<CatalogService>,
        predictions: Arc<dyn PredictionRepository>,
        users: Arc<dyn UserRepository>,
        processed: Arc<dyn ProcessedMatches>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            catalog,
            predictions,
            users,
            processed,
            config,
            match_mutexes: RwLock::new(HashMap::new()),
        }
    }

    /// Scores a match. Safe to call any number of times and from concurrent
    /// pollers: the first call on a finished match awards points, every
    /// later call reports `AlreadyProcessed` and awards nothing.
    #[instrument(skip(self))]
    pub async fn process_match(
        &self,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScoringResult, ScoringError> {
        // Serializes scoring per match id; different matches run in parallel
        let match_lock = self.match_lock(match_id).await;
        let _guard = match_lock.lock().await;

        if self.processed.contains(match_id).await? {
            debug!(match_id = %match_id, "Match already processed, skipping");
            return Ok(ScoringResult::AlreadyProcessed);
        }

        let m = self
            .catalog
            .get(match_id)
            .await?
            .ok_or_else(|| ScoringError::MatchUnknown(match_id.to_string()))?;

        let outcome = match (self.catalog.state_of(&m, now), m.outcome) {
            (MatchState::Finished, Some(outcome)) => outcome,
            _ => {
                debug!(match_id = %match_id, "Match has no determinate outcome yet");
                return Ok(ScoringResult::Pending);
            }
        };

        let predictions = self.predictions.for_match(match_id).await?;

        let results: Vec<(String, bool)> = predictions
            .iter()
            .map(|p| (p.user_id.clone(), p.choice == outcome))
            .collect();
        let mut winners: Vec<String> = results
            .iter()
            .filter(|(_, correct)| *correct)
            .map(|(user_id, _)| user_id.clone())
            .collect();
        winners.sort();

        // The marker is the gate: it must land before any points do, so a
        // failed or repeated attempt can never award a second time. The
        // batch itself is atomic in the repository.
        if !self.processed.try_mark(match_id).await? {
            debug!(match_id = %match_id, "Another scorer marked this match first, skipping");
            return Ok(ScoringResult::AlreadyProcessed);
        }

        self.users
            .record_results(&results, self.config.points_per_correct)
            .await?;

        let points_awarded = winners.len() as u32 * self.config.points_per_correct;
        info!(
            match_id = %match_id,
            outcome = %outcome,
            predictions = predictions.len(),
            winners = winners.len(),
            points_awarded,
            "Match scored"
        );

        Ok(ScoringResult::Scored {
            points_awarded,
            winners,
        })
    }

    async fn match_lock(&self, match_id: &str) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.match_mutexes.read().await;
            if let Some(lock) = guard.get(match_id) {
                return lock.clone();
            }
        }

        let mut guard = self.match_mutexes.write().await;
        guard
            .entry(match_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        CatalogConfig, InMemoryMatchRepository, MatchModel, Outcome, Score,
    };
    use crate::ledger::repository::InMemoryPredictionRepository;
    use crate::ledger::PredictionModel;
    use crate::scoring::processed::InMemoryProcessedMatches;
    use crate::standings::{InMemoryUserRepository, StandingsError, UserRepository, UserStats};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        catalog: Arc<CatalogService>,
        predictions: Arc<InMemoryPredictionRepository>,
        users: Arc<InMemoryUserRepository>,
        processed: Arc<InMemoryProcessedMatches>,
        scoring: Arc<ScoringService>,
    }

    async fn fixture() -> Fixture {
        let catalog = Arc::new(CatalogService::new(
            Arc::new(InMemoryMatchRepository::new()),
            CatalogConfig::default(),
        ));
        let predictions = Arc::new(InMemoryPredictionRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let processed = Arc::new(InMemoryProcessedMatches::new());

        catalog
            .register(MatchModel::new(
                "m1".to_string(),
                "Home FC".to_string(),
                "Away FC".to_string(),
                "Test League".to_string(),
                Utc::now() - Duration::hours(2),
            ))
            .await
            .unwrap();

        let scoring = Arc::new(ScoringService::new(
            catalog.clone(),
            predictions.clone(),
            users.clone(),
            processed.clone(),
            ScoringConfig::default(),
        ));

        Fixture {
            catalog,
            predictions,
            users,
            processed,
            scoring,
        }
    }

    async fn predict(f: &Fixture, user_id: &str, choice: Outcome) {
        f.users.touch(user_id, user_id).await.unwrap();
        f.predictions
            .upsert(&PredictionModel {
                user_id: user_id.to_string(),
                match_id: "m1".to_string(),
                choice,
                submitted_at: Utc::now() - Duration::hours(3),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unfinished_match_is_pending_and_not_marked() {
        let f = fixture().await;
        predict(&f, "u1", Outcome::Home).await;

        let result = f.scoring.process_match("m1", Utc::now()).await.unwrap();
        assert_eq!(result, ScoringResult::Pending);

        // A pending match must stay scoreable once it finishes
        f.catalog
            .mark_finished("m1", Outcome::Home, Some(Score::new(1, 0)))
            .await
            .unwrap();
        let result = f.scoring.process_match("m1", Utc::now()).await.unwrap();
        assert_eq!(result.points_awarded(), 3);
    }

    #[tokio::test]
    async fn awards_points_to_correct_predictions_only() {
        let f = fixture().await;
        predict(&f, "u-right", Outcome::Draw).await;
        predict(&f, "u-wrong", Outcome::Home).await;
        f.catalog
            .mark_finished("m1", Outcome::Draw, Some(Score::new(1, 1)))
            .await
            .unwrap();

        let result = f.scoring.process_match("m1", Utc::now()).await.unwrap();

        assert_eq!(
            result,
            ScoringResult::Scored {
                points_awarded: 3,
                winners: vec!["u-right".to_string()],
            }
        );

        let right = f.users.get("u-right").await.unwrap().unwrap();
        assert_eq!(right.points, 3);
        assert_eq!(right.current_streak, 1);

        let wrong = f.users.get("u-wrong").await.unwrap().unwrap();
        assert_eq!(wrong.points, 0);
        assert_eq!(wrong.current_streak, 0);
    }

    #[tokio::test]
    async fn second_call_is_a_noop() {
        let f = fixture().await;
        predict(&f, "u1", Outcome::Away).await;
        f.catalog
            .mark_finished("m1", Outcome::Away, Some(Score::new(0, 2)))
            .await
            .unwrap();

        let first = f.scoring.process_match("m1", Utc::now()).await.unwrap();
        assert_eq!(first.points_awarded(), 3);

        let second = f.scoring.process_match("m1", Utc::now()).await.unwrap();
        assert_eq!(second, ScoringResult::AlreadyProcessed);

        let user = f.users.get("u1").await.unwrap().unwrap();
        assert_eq!(user.points, 3);
        assert_eq!(user.current_streak, 1);
    }

    #[tokio::test]
    async fn concurrent_pollers_award_points_once() {
        let f = fixture().await;
        predict(&f, "u1", Outcome::Home).await;
        f.catalog
            .mark_finished("m1", Outcome::Home, Some(Score::new(3, 0)))
            .await
            .unwrap();

        let now = Utc::now();
        let a = {
            let scoring = f.scoring.clone();
            tokio::spawn(async move { scoring.process_match("m1", now).await.unwrap() })
        };
        let b = {
            let scoring = f.scoring.clone();
            tokio::spawn(async move { scoring.process_match("m1", now).await.unwrap() })
        };

        let (first, second) = (a.await.unwrap(), b.await.unwrap());

        let scored = [&first, &second]
            .iter()
            .filter(|r| matches!(r, ScoringResult::Scored { .. }))
            .count();
        assert_eq!(scored, 1);
        assert!([&first, &second]
            .iter()
            .any(|r| matches!(r, ScoringResult::AlreadyProcessed)));

        let user = f.users.get("u1").await.unwrap().unwrap();
        assert_eq!(user.points, 3);
    }

    #[tokio::test]
    async fn two_scorers_sharing_storage_award_once() {
        let f = fixture().await;
        predict(&f, "u1", Outcome::Home).await;
        f.catalog
            .mark_finished("m1", Outcome::Home, Some(Score::new(2, 0)))
            .await
            .unwrap();

        // A second service instance with its own lock map, sharing only the
        // stores, like a second process against the same database
        let other = ScoringService::new(
            f.catalog.clone(),
            f.predictions.clone(),
            f.users.clone(),
            f.processed.clone(),
            ScoringConfig::default(),
        );

        let now = Utc::now();
        let a = {
            let scoring = f.scoring.clone();
            tokio::spawn(async move { scoring.process_match("m1", now).await.unwrap() })
        };
        let b = tokio::spawn(async move { other.process_match("m1", now).await.unwrap() });

        let (first, second) = (a.await.unwrap(), b.await.unwrap());

        let scored = [&first, &second]
            .iter()
            .filter(|r| matches!(r, ScoringResult::Scored { .. }))
            .count();
        assert_eq!(scored, 1);

        assert_eq!(f.users.get("u1").await.unwrap().unwrap().points, 3);
    }

    struct FlakyUserRepository {
        inner: InMemoryUserRepository,
        fail_next_batch: AtomicBool,
    }

    #[async_trait]
    impl UserRepository for FlakyUserRepository {
        async fn touch(&self, user_id: &str, display_name: &str) -> Result<(), StandingsError> {
            self.inner.touch(user_id, display_name).await
        }

        async fn get(&self, user_id: &str) -> Result<Option<UserStats>, StandingsError> {
            self.inner.get(user_id).await
        }

        async fn list(&self) -> Result<Vec<UserStats>, StandingsError> {
            self.inner.list().await
        }

        async fn record_result(
            &self,
            user_id: &str,
            correct: bool,
            points: u32,
        ) -> Result<(), StandingsError> {
            self.inner.record_result(user_id, correct, points).await
        }

        async fn record_results(
            &self,
            results: &[(String, bool)],
            points: u32,
        ) -> Result<(), StandingsError> {
            if self.fail_next_batch.swap(false, Ordering::SeqCst) {
                return Err(StandingsError::Repository("connection reset".to_string()));
            }
            self.inner.record_results(results, points).await
        }

        async fn reset(&self, user_id: &str) -> Result<(), StandingsError> {
            self.inner.reset(user_id).await
        }
    }

    #[tokio::test]
    async fn failed_award_cannot_be_retried_into_a_double_award() {
        let catalog = Arc::new(CatalogService::new(
            Arc::new(InMemoryMatchRepository::new()),
            CatalogConfig::default(),
        ));
        catalog
            .register(MatchModel::new(
                "m1".to_string(),
                "Home FC".to_string(),
                "Away FC".to_string(),
                "Test League".to_string(),
                Utc::now() - Duration::hours(2),
            ))
            .await
            .unwrap();

        let predictions = Arc::new(InMemoryPredictionRepository::new());
        let users = Arc::new(FlakyUserRepository {
            inner: InMemoryUserRepository::new(),
            fail_next_batch: AtomicBool::new(true),
        });
        let scoring = ScoringService::new(
            catalog.clone(),
            predictions.clone(),
            users.clone(),
            Arc::new(InMemoryProcessedMatches::new()),
            ScoringConfig::default(),
        );

        for user_id in ["u1", "u2"] {
            predictions
                .upsert(&PredictionModel {
                    user_id: user_id.to_string(),
                    match_id: "m1".to_string(),
                    choice: Outcome::Draw,
                    submitted_at: Utc::now() - Duration::hours(3),
                })
                .await
                .unwrap();
        }
        catalog
            .mark_finished("m1", Outcome::Draw, Some(Score::new(1, 1)))
            .await
            .unwrap();

        // The storage hiccup surfaces as an error on the first attempt
        let first = scoring.process_match("m1", Utc::now()).await;
        assert!(first.is_err());

        // The retry finds the match marked and awards nothing; the failed
        // attempt must not be repeatable into a second round of points
        let second = scoring.process_match("m1", Utc::now()).await.unwrap();
        assert_eq!(second, ScoringResult::AlreadyProcessed);

        for user_id in ["u1", "u2"] {
            let points = users
                .get(user_id)
                .await
                .unwrap()
                .map(|u| u.points)
                .unwrap_or(0);
            assert!(points <= 3, "user {user_id} was awarded more than once");
        }
    }

    #[tokio::test]
    async fn unknown_match_is_an_error() {
        let f = fixture().await;
        let result = f.scoring.process_match("ghost", Utc::now()).await;
        assert!(matches!(result, Err(ScoringError::MatchUnknown(_))));
    }

    #[tokio::test]
    async fn match_with_no_predictions_scores_to_zero() {
        let f = fixture().await;
        f.catalog
            .mark_finished("m1", Outcome::Home, Some(Score::new(1, 0)))
            .await
            .unwrap();

        let result = f.scoring.process_match("m1", Utc::now()).await.unwrap();
        assert_eq!(
            result,
            ScoringResult::Scored {
                points_awarded: 0,
                winners: vec![],
            }
        );
    }

    #[tokio::test]
    async fn custom_point_value_is_used() {
        let f = fixture().await;
        let scoring = ScoringService::new(
            f.catalog.clone(),
            f.predictions.clone(),
            f.users.clone(),
            Arc::new(InMemoryProcessedMatches::new()),
            ScoringConfig {
                points_per_correct: 1,
            },
        );
        predict(&f, "u1", Outcome::Home).await;
        f.catalog
            .mark_finished("m1", Outcome::Home, Some(Score::new(2, 0)))
            .await
            .unwrap();

        let result = scoring.process_match("m1", Utc::now()).await.unwrap();
        assert_eq!(result.points_awarded(), 1);
        assert_eq!(f.users.get("u1").await.unwrap().unwrap().points, 1);
    }
}
