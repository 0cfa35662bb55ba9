use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{error, instrument};

use super::dto::{rank, LeaderboardResponse};
use super::repo::{top_players, LEADERBOARD_LIMIT};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/leaderboard", get(get_leaderboard))
}

#[instrument(skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, (StatusCode, String)> {
    let rows = top_players(&state.db, LEADERBOARD_LIMIT).await.map_err(|e| {
        error!(error = %e, "leaderboard query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch leaderboard".to_string(),
        )
    })?;
    Ok(Json(LeaderboardResponse {
        leaderboard: rank(rows),
    }))
}
