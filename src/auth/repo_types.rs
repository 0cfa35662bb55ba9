use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::suspicious::geo::Coordinates;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                      // unique user ID
    pub email: String,                 // user email
    #[serde(skip_serializing)]
    pub password_hash: String,         // Argon2 hash, not exposed in JSON
    pub display_name: Option<String>,
    pub signup_ip: Option<String>,
    pub signup_lat: Option<f64>,
    pub signup_lng: Option<f64>,
    pub points: i32,
    pub correct_predictions: i32,
    pub wrong_predictions: i32,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,   // latest detection cause only
    pub times_caught: i32,
    pub created_at: OffsetDateTime,    // creation timestamp
}

impl User {
    pub fn signup_coords(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.signup_lat, self.signup_lng)
    }
}

/// Fields captured when an account is created.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub display_name: Option<&'a str>,
    pub signup_ip: Option<&'a str>,
    pub signup_coords: Option<Coordinates>,
}
