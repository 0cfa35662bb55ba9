use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use super::detector::{detect_suspicious_activity, DetectionResult};
use super::repo::{PredictionRepository, UserRepository};

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("store unavailable during {op}: {source}")]
    StoreUnavailable {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DetectionError {
    fn store(op: &'static str, e: anyhow::Error) -> Self {
        DetectionError::StoreUnavailable {
            op,
            source: e.into(),
        }
    }
}

/// Loads every user and prediction, detects collusion and writes the flags back.
///
/// Writes are applied one user at a time. The first failed write aborts the pass and
/// the flags written before it stay in place.
#[instrument(skip_all)]
pub async fn run_detection_pass(
    users: &dyn UserRepository,
    predictions: &dyn PredictionRepository,
) -> Result<DetectionResult, DetectionError> {
    let profiles = users
        .list_all()
        .await
        .map_err(|e| DetectionError::store("list users", e))?;
    let picks = predictions
        .list_all()
        .await
        .map_err(|e| DetectionError::store("list predictions", e))?;
    debug!(users = profiles.len(), predictions = picks.len(), "detection snapshot loaded");

    let result = detect_suspicious_activity(&profiles, &picks);
    if result.is_clean() {
        debug!("no suspicious activity found");
    }

    for flag in &result.flags {
        let found = users
            .flag_user(flag.user_id, &flag.reason)
            .await
            .map_err(|e| DetectionError::store("flag user", e))?;
        if found {
            info!(user_id = %flag.user_id, reason = %flag.reason, "user flagged");
        } else {
            warn!(user_id = %flag.user_id, "user vanished before it could be flagged");
        }
    }

    info!(
        ip_violations = result.ip_violations,
        coord_violations = result.coord_violations,
        flagged = result.flags.len(),
        "suspicious activity check completed"
    );
    Ok(result)
}

/// Fire-and-forget variant: the summary is dropped and failures are only logged.
/// No retry; the next accepted prediction schedules a fresh pass.
pub fn spawn_detection_pass(
    users: Arc<dyn UserRepository>,
    predictions: Arc<dyn PredictionRepository>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            if let Err(e) = run_detection_pass(users.as_ref(), predictions.as_ref()).await {
                error!(error = %e, "background suspicious check failed");
            }
        }
        .instrument(info_span!("background_detection")),
    )
}
