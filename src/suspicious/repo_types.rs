use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::geo::Coordinates;

/// Signup fingerprint of a user as the detector sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupProfile {
    pub id: Uuid,
    pub email: String,
    pub signup_ip: Option<String>,
    pub signup_coords: Option<Coordinates>,
}

/// Raw row; lat/lng are nullable independently of each other.
#[derive(Debug, Clone, FromRow)]
pub struct SignupProfileRow {
    pub id: Uuid,
    pub email: String,
    pub signup_ip: Option<String>,
    pub signup_lat: Option<f64>,
    pub signup_lng: Option<f64>,
}

impl From<SignupProfileRow> for SignupProfile {
    fn from(r: SignupProfileRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            signup_ip: r.signup_ip.filter(|ip| !ip.is_empty()),
            signup_coords: Coordinates::from_parts(r.signup_lat, r.signup_lng),
        }
    }
}

/// One user's pick for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PredictionRecord {
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub predicted_team: String,
}

/// Flagged account as listed on the moderation page.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FlaggedUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub signup_ip: Option<String>,
    pub flag_reason: Option<String>,
    pub times_caught: i32,
}
