use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    CreateMatchRequest, DeclareResultRequest, DeclareResultResponse, UpdateMatchRequest,
};
use super::repo::{self, NewMatch};
use super::repo_types::Match;
use super::scoring::{check_declarable, tally};
use crate::{
    auth::{jwt::AdminUser, repo_types::User},
    predictions::repo as predictions_repo,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_matches))
        .route("/matches/:id", get(get_match))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/matches", post(create_match))
        .route("/admin/matches/:id", put(update_match).delete(delete_match))
        .route("/admin/matches/:id/result", post(declare_result))
}

#[instrument(skip(state))]
pub async fn list_matches(
    State(state): State<AppState>,
) -> Result<Json<Vec<Match>>, (StatusCode, String)> {
    let rows = repo::list_all(&state.db).await.map_err(|e| {
        error!(error = %e, "list matches failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Match>, (StatusCode, String)> {
    match repo::find_by_id(&state.db, id).await {
        Ok(Some(m)) => Ok(Json(m)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Match not found".into())),
        Err(e) => {
            error!(error = %e, %id, "get match failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[instrument(skip(state, _admin, body))]
pub async fn create_match(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<Match>), (StatusCode, String)> {
    if let Err(reason) = body.validate() {
        warn!(reason, "invalid match");
        return Err((StatusCode::BAD_REQUEST, reason.into()));
    }

    let new = NewMatch {
        title: body.title.trim(),
        team_a: body.team_a.trim(),
        team_b: body.team_b.trim(),
        match_date: body.match_date,
        prediction_start_date: body.prediction_start_date,
        prediction_deadline: body.prediction_deadline,
    };
    let created = repo::create(&state.db, &new).await.map_err(|e| {
        error!(error = %e, "create match failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(match_id = %created.id, title = %created.title, "match created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, _admin, body))]
pub async fn update_match(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMatchRequest>,
) -> Result<Json<Match>, (StatusCode, String)> {
    let current = match repo::find_by_id(&state.db, id).await {
        Ok(Some(m)) => m,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "Match not found".into())),
        Err(e) => {
            error!(error = %e, %id, "find match failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let edit = body.merge(&current).map_err(|reason| {
        warn!(%id, reason, "invalid match edit");
        (StatusCode::BAD_REQUEST, reason.to_string())
    })?;

    match repo::update(&state.db, id, &edit.fields(), edit.status).await {
        Ok(Some(m)) => {
            info!(match_id = %m.id, status = %m.status, "match updated");
            Ok(Json(m))
        }
        Ok(None) => Err((StatusCode::NOT_FOUND, "Match not found".into())),
        Err(e) => {
            error!(error = %e, %id, "update match failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[instrument(skip(state, _admin))]
pub async fn delete_match(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match repo::delete(&state.db, id).await {
        Ok(true) => {
            info!(match_id = %id, "match deleted");
            Ok(Json(json!({ "message": "Match deleted" })))
        }
        Ok(false) => Err((StatusCode::NOT_FOUND, "Match not found".into())),
        Err(e) => {
            error!(error = %e, %id, "delete match failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

fn result_failed(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "declare result failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to declare result".to_string(),
    )
}

/// Sets the winner, completes the match and scores every prediction on it.
/// All writes share one transaction holding the match row lock.
#[instrument(skip(state, _admin, body))]
pub async fn declare_result(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<DeclareResultRequest>,
) -> Result<Json<DeclareResultResponse>, (StatusCode, String)> {
    let winner = body.winner.trim();
    if winner.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Winner is required".into()));
    }

    let mut tx = state
        .db
        .begin()
        .await
        .context("begin result transaction")
        .map_err(result_failed)?;

    let m = match repo::lock_by_id(&mut tx, id).await.map_err(result_failed)? {
        Some(m) => m,
        None => return Err((StatusCode::NOT_FOUND, "Match not found".into())),
    };
    if let Err(reason) = check_declarable(&m, winner) {
        warn!(match_id = %id, winner, reason, "result rejected");
        return Err((StatusCode::BAD_REQUEST, reason.into()));
    }

    let picks = predictions_repo::list_for_match(&mut tx, id)
        .await
        .map_err(result_failed)?;
    let scored = tally(&picks, winner);

    let declared = repo::record_result(&mut tx, id, winner)
        .await
        .map_err(result_failed)?;
    predictions_repo::apply_scores(&mut tx, &scored.scores)
        .await
        .map_err(result_failed)?;
    User::apply_point_deltas(&mut tx, &scored.deltas)
        .await
        .map_err(result_failed)?;
    tx.commit()
        .await
        .context("commit result transaction")
        .map_err(result_failed)?;

    info!(
        match_id = %id,
        winner,
        predictions = scored.scores.len(),
        correct = scored.correct(),
        "result declared"
    );
    Ok(Json(DeclareResultResponse {
        message: "Result declared successfully",
        declared,
        predictions_updated: scored.scores.len(),
        correct_predictions: scored.correct(),
    }))
}
