use crate::auth::repo_types::{NewUser, User};
use crate::matches::scoring::PointsDelta;
use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, display_name, signup_ip, signup_lat, \
     signup_lng, points, correct_predictions, wrong_predictions, is_flagged, flag_reason, \
     times_caught, created_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Accounts created from `ip` at or after `since`.
    pub async fn count_signups_from_ip(
        db: &PgPool,
        ip: &str,
        since: OffsetDateTime,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
              FROM users
             WHERE signup_ip = $1 AND created_at >= $2
            "#,
        )
        .bind(ip)
        .bind(since)
        .fetch_one(db)
        .await
        .context("count signups from ip")?;
        Ok(count)
    }

    /// Create a new user with hashed password and signup fingerprint.
    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, display_name, signup_ip, signup_lat, signup_lng)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.display_name)
        .bind(new.signup_ip)
        .bind(new.signup_coords.map(|c| c.lat))
        .bind(new.signup_coords.map(|c| c.lng))
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    /// Adds declared-result points to every affected player in one statement.
    /// Increments are relative to the stored totals.
    pub async fn apply_point_deltas(
        conn: &mut PgConnection,
        deltas: &[PointsDelta],
    ) -> anyhow::Result<u64> {
        if deltas.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = deltas.iter().map(|d| d.user_id).collect();
        let points: Vec<i32> = deltas.iter().map(|d| d.points).collect();
        let correct: Vec<i32> = deltas.iter().map(|d| d.correct).collect();
        let wrong: Vec<i32> = deltas.iter().map(|d| d.wrong).collect();

        let res = sqlx::query(
            r#"
            UPDATE users u
               SET points = u.points + d.points,
                   correct_predictions = u.correct_predictions + d.correct,
                   wrong_predictions = u.wrong_predictions + d.wrong
              FROM UNNEST($1::uuid[], $2::int4[], $3::int4[], $4::int4[])
                   AS d(user_id, points, correct, wrong)
             WHERE u.id = d.user_id
            "#,
        )
        .bind(ids)
        .bind(points)
        .bind(correct)
        .bind(wrong)
        .execute(&mut *conn)
        .await
        .context("apply point deltas")?;
        Ok(res.rows_affected())
    }
}
