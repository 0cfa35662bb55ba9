use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::NewMatch;
use super::repo_types::{Match, MatchStatus};

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub title: String,
    pub team_a: String,
    pub team_b: String,
    #[serde(with = "time::serde::rfc3339")]
    pub match_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub prediction_start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub prediction_deadline: OffsetDateTime,
}

fn validate_fields(
    title: &str,
    team_a: &str,
    team_b: &str,
    match_date: OffsetDateTime,
    prediction_start_date: OffsetDateTime,
    prediction_deadline: OffsetDateTime,
) -> Result<(), &'static str> {
    if title.trim().is_empty() {
        return Err("Title is required");
    }
    let (a, b) = (team_a.trim(), team_b.trim());
    if a.is_empty() || b.is_empty() {
        return Err("Both teams are required");
    }
    if a == b {
        return Err("Teams must be different");
    }
    if prediction_start_date > prediction_deadline {
        return Err("Prediction window opens after it closes");
    }
    if prediction_deadline > match_date {
        return Err("Prediction deadline is after the match starts");
    }
    Ok(())
}

impl CreateMatchRequest {
    /// Returns the first problem found, if any.
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_fields(
            &self.title,
            &self.team_a,
            &self.team_b,
            self.match_date,
            self.prediction_start_date,
            self.prediction_deadline,
        )
    }
}

/// Partial edit; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMatchRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub team_a: Option<String>,
    #[serde(default)]
    pub team_b: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub match_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub prediction_start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub prediction_deadline: Option<OffsetDateTime>,
    #[serde(default)]
    pub status: Option<MatchStatus>,
}

/// Full set of editable fields after merging an edit onto the stored match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEdit {
    pub title: String,
    pub team_a: String,
    pub team_b: String,
    pub match_date: OffsetDateTime,
    pub prediction_start_date: OffsetDateTime,
    pub prediction_deadline: OffsetDateTime,
    pub status: MatchStatus,
}

impl MatchEdit {
    pub fn fields(&self) -> NewMatch<'_> {
        NewMatch {
            title: &self.title,
            team_a: &self.team_a,
            team_b: &self.team_b,
            match_date: self.match_date,
            prediction_start_date: self.prediction_start_date,
            prediction_deadline: self.prediction_deadline,
        }
    }
}

impl UpdateMatchRequest {
    pub fn merge(&self, current: &Match) -> Result<MatchEdit, &'static str> {
        if current.winner.is_some() {
            return Err("Match result already declared");
        }
        let pick = |new: &Option<String>, old: &str| {
            new.as_deref().unwrap_or(old).trim().to_string()
        };
        let edit = MatchEdit {
            title: pick(&self.title, &current.title),
            team_a: pick(&self.team_a, &current.team_a),
            team_b: pick(&self.team_b, &current.team_b),
            match_date: self.match_date.unwrap_or(current.match_date),
            prediction_start_date: self
                .prediction_start_date
                .unwrap_or(current.prediction_start_date),
            prediction_deadline: self
                .prediction_deadline
                .unwrap_or(current.prediction_deadline),
            status: self
                .status
                .or_else(|| current.status())
                .unwrap_or(MatchStatus::Upcoming),
        };
        validate_fields(
            &edit.title,
            &edit.team_a,
            &edit.team_b,
            edit.match_date,
            edit.prediction_start_date,
            edit.prediction_deadline,
        )?;
        Ok(edit)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeclareResultRequest {
    pub winner: String,
}

#[derive(Debug, Serialize)]
pub struct DeclareResultResponse {
    pub message: &'static str,
    #[serde(rename = "match")]
    pub declared: Match,
    pub predictions_updated: usize,
    pub correct_predictions: usize,
}
