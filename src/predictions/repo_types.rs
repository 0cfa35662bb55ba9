use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Prediction record in the database. One per (user, match).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub predicted_team: String,
    /// Set once the match result is declared.
    pub is_correct: Option<bool>,
    pub points_earned: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A player's prediction joined with the match it refers to.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PredictionWithMatch {
    pub id: Uuid,
    pub match_id: Uuid,
    pub predicted_team: String,
    pub is_correct: Option<bool>,
    pub points_earned: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub match_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    pub match_status: String,
    pub winner: Option<String>,
}
