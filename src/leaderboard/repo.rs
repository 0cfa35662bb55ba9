use anyhow::Context;
use sqlx::PgPool;

use super::repo_types::StandingRow;

pub const LEADERBOARD_LIMIT: i64 = 100;

/// Top players by points, ties broken by correct picks then seniority.
pub async fn top_players(db: &PgPool, limit: i64) -> anyhow::Result<Vec<StandingRow>> {
    let rows = sqlx::query_as::<_, StandingRow>(
        r#"
        SELECT email, display_name, points, correct_predictions, wrong_predictions
          FROM users
         ORDER BY points DESC, correct_predictions DESC, created_at ASC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
    .context("load leaderboard")?;
    Ok(rows)
}
