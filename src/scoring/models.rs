use serde::{Deserialize, Serialize};

/// Result of one `process_match` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringResult {
    /// This match was scored earlier; nothing was awarded now. Expected on
    /// every re-poll of a finished match, never an error.
    AlreadyProcessed,
    /// The match has no determinate outcome yet
    Pending,
    /// Points were awarded for the first and only time
    Scored {
        points_awarded: u32,
        winners: Vec<String>,
    },
}

impl ScoringResult {
    pub fn points_awarded(&self) -> u32 {
        match self {
            ScoringResult::Scored { points_awarded, .. } => *points_awarded,
            _ => 0,
        }
    }
}
