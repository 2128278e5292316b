use serde::{Deserialize, Serialize};

use super::models::VoteReceipt;
use crate::catalog::Outcome;

/// Request payload for submitting or replacing a prediction
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub user_id: String,
    pub display_name: String,
    pub match_id: String,
    pub choice: Outcome,
}

/// Request payload for withdrawing a prediction
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub user_id: String,
    pub match_id: String,
}

/// Response for a recorded vote
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub match_id: String,
    pub choice: Outcome,
    pub created: bool,
    pub previous: Option<Outcome>,
}

impl VoteResponse {
    pub fn from_receipt(match_id: String, choice: Outcome, receipt: VoteReceipt) -> Self {
        Self {
            match_id,
            choice,
            created: receipt.created,
            previous: receipt.previous,
        }
    }
}
