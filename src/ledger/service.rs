use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::errors::LedgerError;
use super::models::{MatchTally, PredictionModel, VoteReceipt};
use super::repository::PredictionRepository;
use crate::catalog::{CatalogService, MatchState, Outcome};
use crate::standings::UserRepository;

/// Records and edits per-user predictions against matches known to the
/// catalog. Every mutation re-checks the lock state at its own `now`.
pub struct LedgerService {
    predictions: Arc<dyn PredictionRepository>,
    users: Arc<dyn UserRepository>,
    catalog: Arc<CatalogService>,
}

impl LedgerService {
    pub fn new(
        predictions: Arc<dyn PredictionRepository>,
        users: Arc<dyn UserRepository>,
        catalog: Arc<CatalogService>,
    ) -> Self {
        Self {
            predictions,
            users,
            catalog,
        }
    }

    /// Submits or replaces a prediction. Changing a vote is allowed as long
    /// as the match is still open; the receipt carries the previous choice
    /// so the caller can render either message.
    ///
    /// The user is created on their first vote; the display name is
    /// refreshed on every vote (last-seen wins).
    #[instrument(skip(self, display_name))]
    pub async fn vote(
        &self,
        user_id: &str,
        display_name: &str,
        match_id: &str,
        choice: Outcome,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt, LedgerError> {
        self.require_open(match_id, now).await?;

        self.users.touch(user_id, display_name).await?;

        let previous = self
            .predictions
            .upsert(&PredictionModel {
                user_id: user_id.to_string(),
                match_id: match_id.to_string(),
                choice,
                submitted_at: now,
            })
            .await?;

        info!(
            user_id = %user_id,
            match_id = %match_id,
            choice = %choice,
            changed = previous.is_some(),
            "Prediction recorded"
        );

        Ok(VoteReceipt {
            created: previous.is_none(),
            previous,
        })
    }

    /// Withdraws a prediction, under the same lock rule as voting.
    #[instrument(skip(self))]
    pub async fn unpick(
        &self,
        user_id: &str,
        match_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PredictionModel, LedgerError> {
        self.require_open(match_id, now).await?;

        let removed = self.predictions.remove(user_id, match_id).await?;
        match removed {
            Some(p) => {
                info!(user_id = %user_id, match_id = %match_id, "Prediction withdrawn");
                Ok(p)
            }
            None => Err(LedgerError::NoPrediction {
                user_id: user_id.to_string(),
                match_id: match_id.to_string(),
            }),
        }
    }

    /// Predictions for a match, partitioned by choice.
    #[instrument(skip(self))]
    pub async fn tally(&self, match_id: &str) -> Result<MatchTally, LedgerError> {
        // Tally of an unknown match is MatchUnknown, not an empty tally
        if self.catalog.get(match_id).await?.is_none() {
            return Err(LedgerError::MatchUnknown(match_id.to_string()));
        }

        let predictions = self.predictions.for_match(match_id).await?;
        Ok(MatchTally::from_predictions(
            match_id.to_string(),
            &predictions,
        ))
    }

    /// All predictions a user has made, for the votes/stats surfaces.
    pub async fn votes_by(&self, user_id: &str) -> Result<Vec<PredictionModel>, LedgerError> {
        self.predictions.for_user(user_id).await
    }

    async fn require_open(&self, match_id: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        match self.catalog.lifecycle_state(match_id, now).await? {
            MatchState::Scheduled => Ok(()),
            state => {
                debug!(match_id = %match_id, state = %state, "Rejecting vote, match not open");
                Err(LedgerError::VotingClosed(match_id.to_string()))
            }
        }
    }
}
