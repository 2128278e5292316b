use serde::{Deserialize, Serialize};

use super::models::UserStats;
use crate::ledger::PredictionModel;

/// Response for a user's prediction history and accumulated stats
#[derive(Debug, Serialize, Deserialize)]
pub struct UserPredictionsResponse {
    pub user: UserStats,
    pub predictions: Vec<PredictionModel>,
}
