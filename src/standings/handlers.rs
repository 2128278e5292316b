use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::models::LeaderboardEntry;
use super::types::UserPredictionsResponse;
use crate::shared::{AppError, AppState};

/// HTTP handler for the ranked leaderboard
///
/// GET /leaderboard
#[instrument(name = "leaderboard", skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let ranking = state.leaderboard.rank().await?;
    Ok(Json(ranking))
}

/// HTTP handler for one user's predictions and stats
///
/// GET /users/{id}/predictions
#[instrument(name = "user_predictions", skip(state))]
pub async fn user_predictions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserPredictionsResponse>, AppError> {
    let user = state
        .users
        .get(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

    let predictions = state.ledger.votes_by(&user_id).await?;

    Ok(Json(UserPredictionsResponse { user, predictions }))
}

/// HTTP handler for the explicit admin reset of a user's stats
///
/// POST /admin/users/{id}/reset
#[instrument(name = "reset_user", skip(state))]
pub async fn reset_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.users.reset(&user_id).await?;
    info!(user_id = %user_id, "User stats reset by admin");
    Ok(Json(serde_json::json!({ "reset": user_id })))
}
