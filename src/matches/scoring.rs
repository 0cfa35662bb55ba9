//! Result declaration: which predictions were right and what each player earns.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::repo_types::{Match, MatchStatus};
use crate::predictions::repo_types::Prediction;

pub const CORRECT_PREDICTION_POINTS: i32 = 10;
pub const WRONG_PREDICTION_POINTS: i32 = -2;

/// Outcome written back onto one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionScore {
    pub prediction_id: Uuid,
    pub is_correct: bool,
    pub points: i32,
}

/// What a declared result adds to one player's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsDelta {
    pub user_id: Uuid,
    pub points: i32,
    pub correct: i32,
    pub wrong: i32,
}

#[derive(Debug, Default)]
pub struct ResultTally {
    /// In input order.
    pub scores: Vec<PredictionScore>,
    /// One per player, ordered by user id.
    pub deltas: Vec<PointsDelta>,
}

impl ResultTally {
    pub fn correct(&self) -> usize {
        self.scores.iter().filter(|s| s.is_correct).count()
    }
}

pub fn points_for(predicted_team: &str, winner: &str) -> (bool, i32) {
    if predicted_team == winner {
        (true, CORRECT_PREDICTION_POINTS)
    } else {
        (false, WRONG_PREDICTION_POINTS)
    }
}

pub fn tally(predictions: &[Prediction], winner: &str) -> ResultTally {
    let mut per_user: BTreeMap<Uuid, PointsDelta> = BTreeMap::new();
    let mut scores = Vec::with_capacity(predictions.len());

    for p in predictions {
        let (is_correct, points) = points_for(&p.predicted_team, winner);
        scores.push(PredictionScore {
            prediction_id: p.id,
            is_correct,
            points,
        });

        let delta = per_user.entry(p.user_id).or_insert(PointsDelta {
            user_id: p.user_id,
            points: 0,
            correct: 0,
            wrong: 0,
        });
        delta.points += points;
        if is_correct {
            delta.correct += 1;
        } else {
            delta.wrong += 1;
        }
    }

    ResultTally {
        scores,
        deltas: per_user.into_values().collect(),
    }
}

/// A result can be declared once, and only for one of the two teams.
pub fn check_declarable(m: &Match, winner: &str) -> Result<(), &'static str> {
    if m.status() == Some(MatchStatus::Completed) && m.winner.is_some() {
        return Err("Result already declared");
    }
    if !m.has_team(winner) {
        return Err("Winner must be one of the two teams");
    }
    Ok(())
}
