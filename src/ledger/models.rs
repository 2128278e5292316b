use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Outcome;

/// Database model for the predictions table. Unique on (user_id, match_id):
/// a user has at most one prediction per match, ever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionModel {
    pub user_id: String,
    pub match_id: String,
    pub choice: Outcome,
    pub submitted_at: DateTime<Utc>,
}

/// What a vote call did: created a fresh prediction or replaced an earlier
/// choice. Callers render either message from this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub created: bool,
    pub previous: Option<Outcome>,
}

/// Predictions for one match, partitioned by choice. Used by the scoring
/// engine and by live tally displays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchTally {
    pub match_id: String,
    pub home: Vec<String>,
    pub draw: Vec<String>,
    pub away: Vec<String>,
}

impl MatchTally {
    pub fn from_predictions(match_id: String, predictions: &[PredictionModel]) -> Self {
        let mut tally = MatchTally {
            match_id,
            ..Default::default()
        };
        for p in predictions {
            match p.choice {
                Outcome::Home => tally.home.push(p.user_id.clone()),
                Outcome::Draw => tally.draw.push(p.user_id.clone()),
                Outcome::Away => tally.away.push(p.user_id.clone()),
            }
        }
        tally
    }

    pub fn voters_for(&self, choice: Outcome) -> &[String] {
        match choice {
            Outcome::Home => &self.home,
            Outcome::Draw => &self.draw,
            Outcome::Away => &self.away,
        }
    }

    pub fn total(&self) -> usize {
        self.home.len() + self.draw.len() + self.away.len()
    }
}
