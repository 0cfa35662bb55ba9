use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "upcoming",
            MatchStatus::Live => "live",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(MatchStatus::Upcoming),
            "live" => Some(MatchStatus::Live),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

/// Match record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub title: String,
    pub team_a: String,
    pub team_b: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub prediction_start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub prediction_deadline: OffsetDateTime,
    pub status: String, // upcoming | live | completed
    pub winner: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Match {
    pub fn status(&self) -> Option<MatchStatus> {
        MatchStatus::parse(&self.status)
    }

    pub fn has_team(&self, team: &str) -> bool {
        team == self.team_a || team == self.team_b
    }
}
