//! Maps a raw feed record (status + score + optional winner field) to a
//! canonical outcome. Pure functions, no state.

use thiserror::Error;

use crate::catalog::{Outcome, Score};
use crate::feed::models::RawStatus;

/// What a raw match record resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The match has not produced a determinate result yet
    Pending,
    Final(Outcome),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Score and winner fields are both present but disagree. Surfaced to
    /// the caller, never resolved either way.
    #[error("score {home}-{away} disagrees with declared winner {winner}")]
    AmbiguousResult {
        home: u32,
        away: u32,
        winner: Outcome,
    },

    /// The feed claims the match is finished but supplies neither a usable
    /// score nor a winner field.
    #[error("match reported finished without score or winner")]
    MissingResult,
}

/// Resolves a raw status/score/winner triple to an outcome.
///
/// Anything other than a FINISHED status is `Pending`, whatever the score
/// fields say. Ties are draws, never an error.
pub fn resolve(
    status: RawStatus,
    score: Option<Score>,
    winner: Option<Outcome>,
) -> Result<Resolution, ResolveError> {
    if status != RawStatus::Finished {
        return Ok(Resolution::Pending);
    }

    match (score, winner) {
        (Some(score), Some(winner)) => {
            let from_score = score.outcome();
            if from_score != winner {
                return Err(ResolveError::AmbiguousResult {
                    home: score.home,
                    away: score.away,
                    winner,
                });
            }
            Ok(Resolution::Final(from_score))
        }
        (Some(score), None) => Ok(Resolution::Final(score.outcome())),
        (None, Some(winner)) => Ok(Resolution::Final(winner)),
        (None, None) => Err(ResolveError::MissingResult),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2, 1, Outcome::Home)]
    #[case(1, 1, Outcome::Draw)]
    #[case(0, 3, Outcome::Away)]
    #[case(0, 0, Outcome::Draw)]
    fn final_scores_map_to_outcomes(#[case] home: u32, #[case] away: u32, #[case] expected: Outcome) {
        let resolution = resolve(RawStatus::Finished, Some(Score::new(home, away)), None).unwrap();
        assert_eq!(resolution, Resolution::Final(expected));
    }

    #[rstest]
    #[case(RawStatus::Scheduled)]
    #[case(RawStatus::Timed)]
    #[case(RawStatus::InPlay)]
    #[case(RawStatus::Paused)]
    #[case(RawStatus::Postponed)]
    fn non_finished_status_is_pending_regardless_of_score(#[case] status: RawStatus) {
        let resolution = resolve(status, Some(Score::new(4, 0)), None).unwrap();
        assert_eq!(resolution, Resolution::Pending);
    }

    #[test]
    fn winner_field_alone_is_enough() {
        let resolution = resolve(RawStatus::Finished, None, Some(Outcome::Away)).unwrap();
        assert_eq!(resolution, Resolution::Final(Outcome::Away));
    }

    #[test]
    fn agreeing_score_and_winner_resolve() {
        let resolution =
            resolve(RawStatus::Finished, Some(Score::new(3, 1)), Some(Outcome::Home)).unwrap();
        assert_eq!(resolution, Resolution::Final(Outcome::Home));
    }

    #[test]
    fn disagreeing_score_and_winner_are_ambiguous() {
        let result = resolve(RawStatus::Finished, Some(Score::new(3, 1)), Some(Outcome::Away));
        assert_eq!(
            result,
            Err(ResolveError::AmbiguousResult {
                home: 3,
                away: 1,
                winner: Outcome::Away,
            })
        );
    }

    #[test]
    fn finished_without_any_result_is_an_error() {
        let result = resolve(RawStatus::Finished, None, None);
        assert_eq!(result, Err(ResolveError::MissingResult));
    }
}
