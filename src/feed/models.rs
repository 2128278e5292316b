use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{MatchModel, Outcome, Score};

/// Match status as reported by the external sports-data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawStatus {
    Scheduled,
    Timed,
    InPlay,
    Paused,
    Finished,
    Postponed,
    Suspended,
    Cancelled,
}

/// One match record as delivered by the feed. Field names mirror the wire
/// payload (`utcDate`, `fullTime`, `HOME_TEAM`/`AWAY_TEAM`/`DRAW` winner).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    pub id: u64,
    pub home_team: RawTeam,
    pub away_team: RawTeam,
    pub competition: RawCompetition,
    pub utc_date: DateTime<Utc>,
    pub status: RawStatus,
    #[serde(default)]
    pub score: Option<RawScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeam {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCompetition {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScore {
    #[serde(default)]
    pub winner: Option<String>,
    pub full_time: RawScorePair,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawScorePair {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl RawMatch {
    /// The feed id, treated everywhere else as an opaque string.
    pub fn match_id(&self) -> String {
        self.id.to_string()
    }

    /// Full-time score, if both halves of the pair are present.
    pub fn full_time_score(&self) -> Option<Score> {
        let score = self.score.as_ref()?;
        match (score.full_time.home, score.full_time.away) {
            (Some(home), Some(away)) => Some(Score::new(home, away)),
            _ => None,
        }
    }

    /// Winner field normalized to the canonical outcome enum.
    /// Unknown strings are treated as absent.
    pub fn declared_winner(&self) -> Option<Outcome> {
        match self.score.as_ref()?.winner.as_deref() {
            Some("HOME_TEAM") => Some(Outcome::Home),
            Some("AWAY_TEAM") => Some(Outcome::Away),
            Some("DRAW") => Some(Outcome::Draw),
            _ => None,
        }
    }

    /// Catalog model for this record, lifecycle untouched.
    pub fn to_catalog(&self) -> MatchModel {
        MatchModel::new(
            self.match_id(),
            self.home_team.name.clone(),
            self.away_team.name.clone(),
            self.competition.name.clone(),
            self.utc_date,
        )
    }
}
