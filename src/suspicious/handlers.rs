use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use super::dto::{CheckSuspiciousResponse, UnflagRequest, UnflagResponse};
use super::repo_types::FlaggedUser;
use super::services::run_detection_pass;
use crate::{auth::jwt::AdminUser, state::AppState};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/check-suspicious", post(check_suspicious))
        .route("/admin/flagged-users", get(list_flagged_users))
        .route("/admin/unflag-user", post(unflag_user))
}

/// Runs a detection pass on the request and reports what it flagged.
#[instrument(skip_all)]
pub async fn check_suspicious(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<CheckSuspiciousResponse>, (StatusCode, String)> {
    match run_detection_pass(state.users.as_ref(), state.predictions.as_ref()).await {
        Ok(result) => Ok(Json(CheckSuspiciousResponse::from(&result))),
        Err(e) => {
            error!(error = %e, "check suspicious failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to check suspicious activity".into(),
            ))
        }
    }
}

#[instrument(skip_all)]
pub async fn list_flagged_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<FlaggedUser>>, (StatusCode, String)> {
    let rows = state.users.list_flagged().await.map_err(|e| {
        error!(error = %e, "list flagged users failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load flagged users".to_string())
    })?;
    Ok(Json(rows))
}

#[instrument(skip(state, _admin))]
pub async fn unflag_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<UnflagRequest>,
) -> Result<Json<UnflagResponse>, (StatusCode, String)> {
    match state.users.unflag_user(body.user_id).await {
        Ok(true) => {
            info!(user_id = %body.user_id, "user unflagged");
            Ok(Json(UnflagResponse {
                message: "User unflagged successfully",
            }))
        }
        Ok(false) => Err((StatusCode::NOT_FOUND, "User not found".into())),
        Err(e) => {
            error!(error = %e, user_id = %body.user_id, "unflag user failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to unflag user".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suspicious::memory::{MemoryPredictions, MemoryUsers};
    use crate::suspicious::repo_types::{PredictionRecord, SignupProfile};
    use std::sync::Arc;
    use uuid::Uuid;

    fn shared_ip_fixture() -> (Arc<MemoryUsers>, Arc<MemoryPredictions>, Uuid, Uuid) {
        let a = SignupProfile {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            signup_ip: Some("203.0.113.9".into()),
            signup_coords: None,
        };
        let b = SignupProfile {
            id: Uuid::new_v4(),
            email: "b@example.com".into(),
            signup_ip: Some("203.0.113.9".into()),
            signup_coords: None,
        };
        let m = Uuid::new_v4();
        let preds = vec![
            PredictionRecord {
                user_id: a.id,
                match_id: m,
                predicted_team: "India".into(),
            },
            PredictionRecord {
                user_id: b.id,
                match_id: m,
                predicted_team: "Pakistan".into(),
            },
        ];
        let (a_id, b_id) = (a.id, b.id);
        (
            Arc::new(MemoryUsers::new(vec![a, b])),
            Arc::new(MemoryPredictions::new(preds)),
            a_id,
            b_id,
        )
    }

    #[tokio::test]
    async fn check_reports_shared_ip_pair() {
        let (users, predictions, _, _) = shared_ip_fixture();
        let state = AppState::fake_with_stores(users, predictions);

        let Json(body) = check_suspicious(State(state), AdminUser)
            .await
            .expect("check should succeed");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["flagged"]["ip"], 2);
        assert_eq!(json["flagged"]["coords"], 0);
        assert_eq!(json["totalViolations"], 2);
        let rows = json["flaggedUsers"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["email"], "a@example.com");
        assert_eq!(rows[0]["reason"], "Same IP (203.0.113.9)");
    }

    #[tokio::test]
    async fn check_failure_is_generic() {
        let (users, predictions, _, _) = shared_ip_fixture();
        predictions.set_unavailable(true);
        let state = AppState::fake_with_stores(users, predictions);

        let (status, message) = check_suspicious(State(state), AdminUser)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Failed to check suspicious activity");
    }

    #[tokio::test]
    async fn unflag_clears_flag_but_keeps_history() {
        let (users, predictions, a_id, b_id) = shared_ip_fixture();
        let state = AppState::fake_with_stores(users.clone(), predictions);

        let Json(report) = check_suspicious(State(state.clone()), AdminUser)
            .await
            .expect("check should succeed");
        assert_eq!(report.total_violations, 2);

        let Json(flagged) = list_flagged_users(State(state.clone()), AdminUser)
            .await
            .expect("list flagged");
        assert_eq!(flagged.len(), 2);

        let Json(unflagged) =
            unflag_user(State(state.clone()), AdminUser, Json(UnflagRequest { user_id: a_id }))
                .await
                .expect("unflag");
        assert_eq!(unflagged.message, "User unflagged successfully");

        let Json(flagged) = list_flagged_users(State(state), AdminUser)
            .await
            .expect("list flagged");
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, b_id);

        let a = users.flag_state(a_id).await.unwrap();
        assert!(!a.is_flagged);
        assert_eq!(a.flag_reason, None);
        assert_eq!(a.times_caught, 1);
    }

    #[tokio::test]
    async fn unflag_unknown_user_is_not_found() {
        let state = AppState::fake();
        let (status, _) = unflag_user(
            State(state),
            AdminUser,
            Json(UnflagRequest {
                user_id: Uuid::new_v4(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
