use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::detector::{DetectionResult, FlaggedExample};

/// Rows shown to the admin after a manual check.
pub const REPORT_EXAMPLE_LIMIT: usize = 10;

#[derive(Debug, Serialize)]
pub struct FlaggedCounts {
    pub ip: usize,
    pub coords: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSuspiciousResponse {
    pub message: &'static str,
    pub flagged: FlaggedCounts,
    pub flagged_users: Vec<FlaggedExample>,
    pub total_violations: usize,
}

impl From<&DetectionResult> for CheckSuspiciousResponse {
    fn from(r: &DetectionResult) -> Self {
        Self {
            message: "Suspicious activity check completed",
            flagged: FlaggedCounts {
                ip: r.ip_violations,
                coords: r.coord_violations,
            },
            flagged_users: r.flagged_examples(REPORT_EXAMPLE_LIMIT),
            total_violations: r.total_violations(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UnflagRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UnflagResponse {
    pub message: &'static str,
}
