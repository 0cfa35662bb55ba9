use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::User;
use crate::suspicious::geo::Coordinates;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Browser geolocation at signup, if the player allowed it.
    #[serde(default)]
    pub signup_coords: Option<Coordinates>,
}

/// Request body for player and operator login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub access_token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            display_name: u.display_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub points: i32,
    pub correct_predictions: i32,
    pub wrong_predictions: i32,
    pub is_flagged: bool,
    pub times_caught: i32,
}

impl From<User> for MeResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            points: u.points,
            correct_predictions: u.correct_predictions,
            wrong_predictions: u.wrong_predictions,
            is_flagged: u.is_flagged,
            times_caught: u.times_caught,
        }
    }
}
