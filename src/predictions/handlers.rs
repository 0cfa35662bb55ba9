use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use super::dto::{SubmitPredictionRequest, SubmitPredictionResponse};
use super::repo;
use super::repo_types::PredictionWithMatch;
use crate::{
    auth::jwt::AuthUser,
    matches::{
        repo as matches_repo,
        repo_types::{Match, MatchStatus},
    },
    state::AppState,
    suspicious::services::spawn_detection_pass,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/predictions", get(list_my_predictions).post(submit_prediction))
}

/// Whether `team` can still be picked for `m` at `now`.
fn check_open(m: &Match, now: OffsetDateTime, team: &str) -> Result<(), &'static str> {
    if now < m.prediction_start_date {
        return Err("Prediction window has not opened yet");
    }
    if now > m.prediction_deadline {
        return Err("Prediction deadline has passed");
    }
    if m.status() != Some(MatchStatus::Upcoming) {
        return Err("Cannot predict on live or completed matches");
    }
    if !m.has_team(team) {
        return Err("Invalid team selection");
    }
    Ok(())
}

#[instrument(skip(state, body))]
pub async fn submit_prediction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SubmitPredictionRequest>,
) -> Result<(StatusCode, Json<SubmitPredictionResponse>), (StatusCode, String)> {
    let team = body.predicted_team.trim();
    if team.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Predicted team is required".into()));
    }

    let m = match matches_repo::find_by_id(&state.db, body.match_id).await {
        Ok(Some(m)) => m,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "Match not found".into())),
        Err(e) => {
            error!(error = %e, match_id = %body.match_id, "find match failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if let Err(reason) = check_open(&m, OffsetDateTime::now_utc(), team) {
        warn!(%user_id, match_id = %m.id, reason, "prediction rejected");
        return Err((StatusCode::BAD_REQUEST, reason.into()));
    }

    let already = repo::exists_for(&state.db, user_id, m.id).await.map_err(|e| {
        error!(error = %e, "exists_for failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    if already {
        return Err((
            StatusCode::CONFLICT,
            "You have already made a prediction for this match".into(),
        ));
    }

    let prediction = match repo::insert_unique(&state.db, user_id, m.id, team).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return Err((
                StatusCode::CONFLICT,
                "You have already made a prediction for this match".into(),
            ))
        }
        Err(e) => {
            error!(error = %e, "insert prediction failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(%user_id, match_id = %m.id, team = %prediction.predicted_team, "prediction submitted");

    if state.config.detection.background_enabled {
        spawn_detection_pass(state.users.clone(), state.predictions.clone());
    } else {
        debug!("background detection disabled");
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitPredictionResponse {
            message: "Prediction submitted successfully!",
            prediction,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_my_predictions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PredictionWithMatch>>, (StatusCode, String)> {
    let rows = repo::list_by_user(&state.db, user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "list predictions failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(rows))
}
