//! Multi-accounting detection: correlates signup fingerprints with opposing
//! predictions and flags the accounts involved.

pub mod detector;
mod dto;
pub mod geo;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
