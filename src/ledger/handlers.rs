use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use tracing::{info, instrument};

use super::models::MatchTally;
use super::types::{VoteRequest, VoteResponse, WithdrawRequest};
use crate::shared::{AppError, AppState};

/// HTTP handler for submitting or replacing a prediction
///
/// POST /predictions
#[instrument(name = "submit_prediction", skip(state, request), fields(user_id = %request.user_id, match_id = %request.match_id))]
pub async fn submit_prediction(
    State(state): State<AppState>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, AppError> {
    let receipt = state
        .ledger
        .vote(
            &request.user_id,
            &request.display_name,
            &request.match_id,
            request.choice,
            Utc::now(),
        )
        .await?;

    info!(
        user_id = %request.user_id,
        match_id = %request.match_id,
        created = receipt.created,
        "Prediction accepted"
    );

    Ok(Json(VoteResponse::from_receipt(
        request.match_id,
        request.choice,
        receipt,
    )))
}

/// HTTP handler for withdrawing a prediction
///
/// DELETE /predictions
#[instrument(name = "withdraw_prediction", skip(state, request), fields(user_id = %request.user_id, match_id = %request.match_id))]
pub async fn withdraw_prediction(
    State(state): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<MatchTally>, AppError> {
    state
        .ledger
        .unpick(&request.user_id, &request.match_id, Utc::now())
        .await?;

    // Return the refreshed tally so the caller can redraw its display
    let tally = state.ledger.tally(&request.match_id).await?;
    Ok(Json(tally))
}

/// HTTP handler for the live tally of a match
///
/// GET /matches/{id}/tally
#[instrument(name = "match_tally", skip(state))]
pub async fn match_tally(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchTally>, AppError> {
    let tally = state.ledger.tally(&match_id).await?;
    Ok(Json(tally))
}
