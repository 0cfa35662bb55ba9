use sqlx::FromRow;

/// One player's standing as stored.
#[derive(Debug, Clone, FromRow)]
pub struct StandingRow {
    pub email: String,
    pub display_name: Option<String>,
    pub points: i32,
    pub correct_predictions: i32,
    pub wrong_predictions: i32,
}
