//! Liveness and diagnostics

use crate::state::AppState;
use quest_core::{Json, State};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PREVIEW_CHARS: usize = 200;

fn count_filter() -> [(&'static str, String); 1] {
    [("select", "count".to_string())]
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Quantum Quest Backend is running!",
        "version": "1.0.0",
        "supabase_connected": true,
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = match state.db.probe("users", &count_filter(), Some(PROBE_TIMEOUT)).await {
        Ok(probe) if probe.is_ok() => "connected",
        Ok(probe) => {
            debug!(status = probe.status, "Database probe returned an error status");
            "error"
        }
        Err(err) => {
            debug!(error = %err, "Database probe failed");
            "disconnected"
        }
    };

    Json(json!({
        "status": "healthy",
        "quantum_engine": "operational",
        "database": database,
        "websockets": "active",
    }))
}

pub async fn models() -> Json<Value> {
    Json(json!({
        "models": [
            {"id": "quantum-gpt", "name": "Quantum GPT", "description": "AI model for quantum computing help"}
        ]
    }))
}

/// Connection diagnostic
pub async fn test_supabase(State(state): State<AppState>) -> Json<Value> {
    match state.db.probe("users", &count_filter(), None).await {
        Ok(probe) => {
            let preview: Option<String> = if probe.body.is_empty() {
                None
            } else {
                Some(probe.body.chars().take(PREVIEW_CHARS).collect())
            };
            Json(json!({
                "supabase_connection": if probe.is_ok() { "OK" } else { "ERROR" },
                "status_code": probe.status,
                "response": preview,
                "url": state.db.rest_url(),
                "headers_used": "apikey and Authorization headers set",
            }))
        }
        Err(err) => Json(json!({
            "supabase_connection": "ERROR",
            "error": err.to_string(),
        })),
    }
}
