use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{FlaggedUser, PredictionRecord, SignupProfile, SignupProfileRow};

/// User-side store consumed and mutated by detection passes.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Signup fingerprints of every user.
    async fn list_all(&self) -> anyhow::Result<Vec<SignupProfile>>;

    /// Marks the user as flagged with `reason` and increments `times_caught` by one,
    /// in place. Returns false if the user no longer exists.
    async fn flag_user(&self, user_id: Uuid, reason: &str) -> anyhow::Result<bool>;

    async fn list_flagged(&self) -> anyhow::Result<Vec<FlaggedUser>>;

    /// Clears the flag and its reason. `times_caught` is kept.
    async fn unflag_user(&self, user_id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    async fn list_all(&self) -> anyhow::Result<Vec<PredictionRecord>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list_all(&self) -> anyhow::Result<Vec<SignupProfile>> {
        let rows = sqlx::query_as::<_, SignupProfileRow>(
            r#"
            SELECT id, email, signup_ip, signup_lat, signup_lng
              FROM users
             ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows.into_iter().map(SignupProfile::from).collect())
    }

    async fn flag_user(&self, user_id: Uuid, reason: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET is_flagged = TRUE,
                   flag_reason = $2,
                   times_caught = times_caught + 1
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(reason)
        .execute(&self.db)
        .await
        .with_context(|| format!("flag user {}", user_id))?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_flagged(&self) -> anyhow::Result<Vec<FlaggedUser>> {
        let rows = sqlx::query_as::<_, FlaggedUser>(
            r#"
            SELECT id, email, display_name, signup_ip, flag_reason, times_caught
              FROM users
             WHERE is_flagged
             ORDER BY times_caught DESC, email ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list flagged users")?;
        Ok(rows)
    }

    async fn unflag_user(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET is_flagged = FALSE,
                   flag_reason = NULL
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await
        .with_context(|| format!("unflag user {}", user_id))?;
        Ok(res.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgPredictionRepository {
    db: PgPool,
}

impl PgPredictionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PredictionRepository for PgPredictionRepository {
    async fn list_all(&self) -> anyhow::Result<Vec<PredictionRecord>> {
        let rows = sqlx::query_as::<_, PredictionRecord>(
            r#"
            SELECT user_id, match_id, predicted_team
              FROM predictions
             ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list predictions")?;
        Ok(rows)
    }
}
