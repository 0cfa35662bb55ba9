use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Match, MatchStatus};

const MATCH_COLUMNS: &str = "id, title, team_a, team_b, match_date, prediction_start_date, \
     prediction_deadline, status, winner, created_at";

pub struct NewMatch<'a> {
    pub title: &'a str,
    pub team_a: &'a str,
    pub team_b: &'a str,
    pub match_date: OffsetDateTime,
    pub prediction_start_date: OffsetDateTime,
    pub prediction_deadline: OffsetDateTime,
}

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Match>> {
    let rows = sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches ORDER BY match_date ASC"
    ))
    .fetch_all(db)
    .await
    .context("list matches")?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Match>> {
    let row = sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find match by id")?;
    Ok(row)
}

pub async fn create(db: &PgPool, new: &NewMatch<'_>) -> anyhow::Result<Match> {
    let row = sqlx::query_as::<_, Match>(&format!(
        r#"
        INSERT INTO matches (title, team_a, team_b, match_date, prediction_start_date, prediction_deadline)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(new.title)
    .bind(new.team_a)
    .bind(new.team_b)
    .bind(new.match_date)
    .bind(new.prediction_start_date)
    .bind(new.prediction_deadline)
    .fetch_one(db)
    .await
    .context("insert match")?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    fields: &NewMatch<'_>,
    status: MatchStatus,
) -> anyhow::Result<Option<Match>> {
    let row = sqlx::query_as::<_, Match>(&format!(
        r#"
        UPDATE matches
           SET title = $2, team_a = $3, team_b = $4, match_date = $5,
               prediction_start_date = $6, prediction_deadline = $7, status = $8
         WHERE id = $1
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(fields.title)
    .bind(fields.team_a)
    .bind(fields.team_b)
    .bind(fields.match_date)
    .bind(fields.prediction_start_date)
    .bind(fields.prediction_deadline)
    .bind(status.as_str())
    .fetch_optional(db)
    .await
    .context("update match")?;
    Ok(row)
}

/// Predictions on the match go with it (`ON DELETE CASCADE`).
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM matches WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete match")?;
    Ok(res.rows_affected() > 0)
}

/// Reads the match and holds its row lock until the transaction ends.
pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Option<Match>> {
    let row = sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .context("lock match")?;
    Ok(row)
}

pub async fn record_result(conn: &mut PgConnection, id: Uuid, winner: &str) -> anyhow::Result<Match> {
    let row = sqlx::query_as::<_, Match>(&format!(
        r#"
        UPDATE matches
           SET winner = $2, status = 'completed'
         WHERE id = $1
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(winner)
    .fetch_one(&mut *conn)
    .await
    .context("record match result")?;
    Ok(row)
}
