//! In-memory stores for exercising detection without Postgres.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{PredictionRepository, UserRepository};
use super::repo_types::{FlaggedUser, PredictionRecord, SignupProfile};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagState {
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub times_caught: i32,
}

pub struct MemoryUsers {
    rows: RwLock<Vec<(SignupProfile, FlagState)>>,
    writes_left: AtomicUsize,
}

impl MemoryUsers {
    pub fn new(profiles: Vec<SignupProfile>) -> Self {
        Self {
            rows: RwLock::new(
                profiles
                    .into_iter()
                    .map(|p| (p, FlagState::default()))
                    .collect(),
            ),
            writes_left: AtomicUsize::new(usize::MAX),
        }
    }

    /// Lets `n` flag writes through, then fails every following one.
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_left.store(n, Ordering::SeqCst);
    }

    pub async fn flag_state(&self, user_id: Uuid) -> Option<FlagState> {
        self.rows
            .read()
            .await
            .iter()
            .find(|(p, _)| p.id == user_id)
            .map(|(_, s)| s.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn list_all(&self) -> anyhow::Result<Vec<SignupProfile>> {
        Ok(self.rows.read().await.iter().map(|(p, _)| p.clone()).collect())
    }

    async fn flag_user(&self, user_id: Uuid, reason: &str) -> anyhow::Result<bool> {
        let allowed = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            anyhow::bail!("connection reset");
        }

        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|(p, _)| p.id == user_id) {
            Some((_, state)) => {
                state.is_flagged = true;
                state.flag_reason = Some(reason.to_string());
                state.times_caught += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_flagged(&self) -> anyhow::Result<Vec<FlaggedUser>> {
        let mut out: Vec<FlaggedUser> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.is_flagged)
            .map(|(p, s)| FlaggedUser {
                id: p.id,
                email: p.email.clone(),
                display_name: None,
                signup_ip: p.signup_ip.clone(),
                flag_reason: s.flag_reason.clone(),
                times_caught: s.times_caught,
            })
            .collect();
        out.sort_by(|a, b| b.times_caught.cmp(&a.times_caught).then(a.email.cmp(&b.email)));
        Ok(out)
    }

    async fn unflag_user(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|(p, _)| p.id == user_id) {
            Some((_, state)) => {
                state.is_flagged = false;
                state.flag_reason = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub struct MemoryPredictions {
    rows: RwLock<Vec<PredictionRecord>>,
    unavailable: AtomicBool,
}

impl MemoryPredictions {
    pub fn new(rows: Vec<PredictionRecord>) -> Self {
        Self {
            rows: RwLock::new(rows),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl PredictionRepository for MemoryPredictions {
    async fn list_all(&self) -> anyhow::Result<Vec<PredictionRecord>> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("prediction store unreachable");
        }
        Ok(self.rows.read().await.clone())
    }
}
