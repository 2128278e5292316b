use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Canonical result of a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

/// Lifecycle of a match as observed by the catalog.
///
/// SCHEDULED and LOCKED are partly time-derived: a match that was never
/// explicitly locked still reports LOCKED once "now" passes the lock window.
/// See `CatalogService::state_of`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    Scheduled,
    Locked,
    Finished,
}

/// Full-time score pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Outcome implied by the score. Equal scores are a draw, never an error.
    pub fn outcome(&self) -> Outcome {
        use std::cmp::Ordering::*;
        match self.home.cmp(&self.away) {
            Greater => Outcome::Home,
            Less => Outcome::Away,
            Equal => Outcome::Draw,
        }
    }
}

/// Database model for the matches table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchModel {
    pub id: String, // Opaque id assigned by the external feed
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub kickoff: DateTime<Utc>,
    pub state: MatchState,
    pub outcome: Option<Outcome>,
    pub score: Option<Score>,
}

impl MatchModel {
    /// Creates a freshly observed match, not yet locked or finished
    pub fn new(
        id: String,
        home_team: String,
        away_team: String,
        competition: String,
        kickoff: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            home_team,
            away_team,
            competition,
            kickoff,
            state: MatchState::Scheduled,
            outcome: None,
            score: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == MatchState::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_outcome_covers_all_orderings() {
        assert_eq!(Score::new(2, 1).outcome(), Outcome::Home);
        assert_eq!(Score::new(0, 3).outcome(), Outcome::Away);
        assert_eq!(Score::new(1, 1).outcome(), Outcome::Draw);
        assert_eq!(Score::new(0, 0).outcome(), Outcome::Draw);
    }

    #[test]
    fn outcome_round_trips_through_text() {
        // Stored as TEXT in the database, so Display and FromStr must agree
        for outcome in [Outcome::Home, Outcome::Draw, Outcome::Away] {
            let text = outcome.to_string();
            assert_eq!(text.parse::<Outcome>().unwrap(), outcome);
        }
        assert_eq!(Outcome::Home.to_string(), "HOME");
        assert_eq!(MatchState::Scheduled.to_string(), "SCHEDULED");
    }
}
