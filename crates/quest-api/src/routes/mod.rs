//! Route handlers

pub mod achievements;
pub mod auth;
pub mod game;
pub mod health;
pub mod leaderboard;
pub mod quantum;
pub mod users;

use chrono::Utc;
use serde_json::{json, Value};

/// Current time, RFC 3339 UTC
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Initial `total_score` leaderboard row for a new player
pub(crate) fn initial_leaderboard_entry(user_id: &Value) -> Value {
    json!([{
        "user_id": user_id,
        "category": "total_score",
        "completion_time": null,
        "total_score": 0,
        "difficulty": "easy",
        "rooms_completed": 0,
        "hints_used": 0,
        "achieved_at": now(),
    }])
}
