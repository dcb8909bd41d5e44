//! Leaderboards
//!
//! Every payload carries `source`: `database` for real leaderboard rows,
//! `user_stats` when rebuilt from player totals, `demo` for canned data.
//! Canned data is only served while `LEADERBOARD_DEMO_FALLBACK` is on.

use crate::error::{Failure, Result};
use crate::state::AppState;
use crate::supabase::eq;
use quest_core::{Json, State};
use serde_json::{json, Value};
use tracing::{debug, warn};

const TOP: &str = "10";

fn payload(entries: Vec<Value>, kind: &str, source: &str) -> Json<Value> {
    Json(json!({ "entries": entries, "type": kind, "source": source }))
}

/// Attach `rank` and the player's `username`/`full_name` to each entry
async fn enrich(state: &AppState, entries: Vec<Value>) -> Vec<Value> {
    let mut enriched = Vec::with_capacity(entries.len());
    for (index, mut entry) in entries.into_iter().enumerate() {
        let user_id = entry.get("user_id").cloned().unwrap_or(Value::Null);
        let filter = match &user_id {
            Value::String(id) => Some(eq(id)),
            Value::Number(id) => Some(eq(id)),
            _ => None,
        };

        if let (Some(filter), Some(fields)) = (filter, entry.as_object_mut()) {
            match state
                .db
                .select_one("users", &[("id", filter), ("select", "username,full_name".to_string())])
                .await
            {
                Ok(Some(Value::Object(user))) => fields.extend(user),
                Ok(_) => {}
                Err(err) => debug!(error = %err, "Leaderboard user lookup failed"),
            }
        }
        if let Some(fields) = entry.as_object_mut() {
            fields.insert("rank".to_string(), json!(index + 1));
        }
        enriched.push(entry);
    }
    enriched
}

fn demo_score_entries() -> Vec<Value> {
    vec![
        json!({"rank": 1, "username": "QuantumAlice", "total_score": 4500, "completion_time": 180, "games_completed": 15}),
        json!({"rank": 2, "username": "EntangleCharlie", "total_score": 3200, "completion_time": 200, "games_completed": 12}),
        json!({"rank": 3, "username": "SuperpositionBob", "total_score": 2800, "completion_time": 240, "games_completed": 8}),
    ]
}

fn demo_speed_entries() -> Vec<Value> {
    vec![
        json!({"rank": 1, "user_id": "demo-user-1", "username": "SpeedyQuantum", "full_name": "Speedy Player", "total_score": 1200, "completion_time": 180, "difficulty": "hard"}),
        json!({"rank": 2, "user_id": "demo-user-2", "username": "FastAlice", "full_name": "Alice Cooper", "total_score": 1000, "completion_time": 220, "difficulty": "medium"}),
        json!({"rank": 3, "user_id": "demo-user-3", "username": "QuickBob", "full_name": "Bob Wilson", "total_score": 800, "completion_time": 260, "difficulty": "easy"}),
    ]
}

/// Leaderboard row rebuilt from a player's totals
fn from_user_stats(rank: usize, user: &Value) -> Value {
    json!({
        "rank": rank,
        "username": user.get("username").cloned().unwrap_or_else(|| json!("Unknown")),
        "full_name": user.get("full_name").cloned().unwrap_or_else(|| json!("")),
        "total_score": user.get("total_score").cloned().unwrap_or_else(|| json!(0)),
        "completion_time": user.get("best_completion_time").cloned().unwrap_or(Value::Null),
        "games_completed": user.get("games_completed").cloned().unwrap_or_else(|| json!(0)),
        "quantum_mastery_level": user.get("quantum_mastery_level").cloned().unwrap_or_else(|| json!(1)),
    })
}

fn demo_or_unavailable(state: &AppState, kind: &str, entries: Vec<Value>) -> Result<Json<Value>> {
    if state.config.leaderboard_demo_fallback {
        warn!(leaderboard = kind, "Serving demo leaderboard");
        Ok(payload(entries, kind, "demo"))
    } else {
        Err(Failure::service_unavailable("Leaderboard is unavailable"))
    }
}

/// Top 10 by total score
pub async fn score(State(state): State<AppState>) -> Result<Json<Value>> {
    let entries = state
        .db
        .select(
            "leaderboard_entries",
            &[
                ("category", eq("total_score")),
                ("order", "total_score.desc".to_string()),
                ("limit", TOP.to_string()),
            ],
        )
        .await;

    match entries {
        Ok(entries) if !entries.is_empty() => {
            return Ok(payload(enrich(&state, entries).await, "score", "database"));
        }
        Ok(_) => debug!("No score leaderboard entries, using player totals"),
        Err(err) => warn!(error = %err, "Score leaderboard query failed, using player totals"),
    }

    let users = state
        .db
        .select(
            "users",
            &[
                ("order", "total_score.desc".to_string()),
                ("limit", TOP.to_string()),
            ],
        )
        .await;

    match users {
        Ok(users) => {
            let entries = users
                .iter()
                .enumerate()
                .map(|(index, user)| from_user_stats(index + 1, user))
                .collect();
            Ok(payload(entries, "score", "user_stats"))
        }
        Err(err) => {
            warn!(error = %err, "Player totals query failed");
            demo_or_unavailable(&state, "score", demo_score_entries())
        }
    }
}

/// Top 10 by fastest completion
pub async fn speed(State(state): State<AppState>) -> Result<Json<Value>> {
    let entries = state
        .db
        .select(
            "leaderboard_entries",
            &[
                ("category", eq("completion_time")),
                ("order", "completion_time.asc".to_string()),
                ("limit", TOP.to_string()),
            ],
        )
        .await;

    match entries {
        Ok(entries) if !entries.is_empty() => {
            Ok(payload(enrich(&state, entries).await, "speed", "database"))
        }
        Ok(entries) if !state.config.leaderboard_demo_fallback => {
            Ok(payload(entries, "speed", "database"))
        }
        Ok(_) => demo_or_unavailable(&state, "speed", demo_speed_entries()),
        Err(err) => {
            warn!(error = %err, "Speed leaderboard query failed");
            demo_or_unavailable(&state, "speed", demo_speed_entries())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_stats_defaults() {
        let entry = from_user_stats(3, &json!({"username": "ada", "total_score": 50}));
        assert_eq!(entry["rank"], 3);
        assert_eq!(entry["username"], "ada");
        assert_eq!(entry["full_name"], "");
        assert_eq!(entry["completion_time"], Value::Null);
        assert_eq!(entry["quantum_mastery_level"], 1);

        let unknown = from_user_stats(1, &json!({}));
        assert_eq!(unknown["username"], "Unknown");
    }

    #[test]
    fn test_demo_entries_are_ranked() {
        for (index, entry) in demo_speed_entries().iter().enumerate() {
            assert_eq!(entry["rank"], index + 1);
        }
        assert_eq!(demo_score_entries()[0]["username"], "QuantumAlice");
    }
}
