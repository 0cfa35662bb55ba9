use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Prediction;

#[derive(Debug, Deserialize)]
pub struct SubmitPredictionRequest {
    pub match_id: Uuid,
    pub predicted_team: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitPredictionResponse {
    pub message: &'static str,
    pub prediction: Prediction,
}
