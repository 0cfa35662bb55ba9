use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::repo_types::{Prediction, PredictionWithMatch};
use crate::matches::scoring::PredictionScore;

const PREDICTION_COLUMNS: &str =
    "id, user_id, match_id, predicted_team, is_correct, points_earned, created_at";

/// Inserts the prediction unless the user already has one for this match,
/// in which case `None` is returned.
pub async fn insert_unique(
    db: &PgPool,
    user_id: Uuid,
    match_id: Uuid,
    predicted_team: &str,
) -> anyhow::Result<Option<Prediction>> {
    let row = sqlx::query_as::<_, Prediction>(&format!(
        r#"
        INSERT INTO predictions (user_id, match_id, predicted_team)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, match_id) DO NOTHING
        RETURNING {PREDICTION_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(match_id)
    .bind(predicted_team)
    .fetch_optional(db)
    .await
    .context("insert prediction")?;
    Ok(row)
}

pub async fn exists_for(db: &PgPool, user_id: Uuid, match_id: Uuid) -> anyhow::Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM predictions WHERE user_id = $1 AND match_id = $2
        )
        "#,
    )
    .bind(user_id)
    .bind(match_id)
    .fetch_one(db)
    .await
    .context("check existing prediction")?;
    Ok(exists)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PredictionWithMatch>> {
    let rows = sqlx::query_as::<_, PredictionWithMatch>(
        r#"
        SELECT p.id, p.match_id, p.predicted_team, p.is_correct, p.points_earned, p.created_at,
               m.title AS match_title, m.match_date, m.status AS match_status, m.winner
          FROM predictions p
          JOIN matches m ON m.id = p.match_id
         WHERE p.user_id = $1
         ORDER BY p.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list predictions by user")?;
    Ok(rows)
}

/// Every prediction on a match, oldest first. Runs inside the result transaction.
pub async fn list_for_match(conn: &mut PgConnection, match_id: Uuid) -> anyhow::Result<Vec<Prediction>> {
    let rows = sqlx::query_as::<_, Prediction>(&format!(
        "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE match_id = $1 ORDER BY created_at ASC, id ASC"
    ))
    .bind(match_id)
    .fetch_all(&mut *conn)
    .await
    .context("list predictions for match")?;
    Ok(rows)
}

/// Writes every score in one statement.
pub async fn apply_scores(conn: &mut PgConnection, scores: &[PredictionScore]) -> anyhow::Result<u64> {
    if scores.is_empty() {
        return Ok(0);
    }
    let ids: Vec<Uuid> = scores.iter().map(|s| s.prediction_id).collect();
    let correct: Vec<bool> = scores.iter().map(|s| s.is_correct).collect();
    let points: Vec<i32> = scores.iter().map(|s| s.points).collect();

    let res = sqlx::query(
        r#"
        UPDATE predictions p
           SET is_correct = s.is_correct,
               points_earned = s.points
          FROM UNNEST($1::uuid[], $2::bool[], $3::int4[]) AS s(id, is_correct, points)
         WHERE p.id = s.id
        "#,
    )
    .bind(ids)
    .bind(correct)
    .bind(points)
    .execute(&mut *conn)
    .await
    .context("apply prediction scores")?;
    Ok(res.rows_affected())
}
