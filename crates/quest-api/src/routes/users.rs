//! Raw user listing and creation

use crate::error::{Failure, Result};
use crate::state::AppState;
use crate::supabase::Key;
use quest_core::{Json, State};
use serde_json::{json, Value};

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let users = state
        .db
        .select("users", &[])
        .await
        .map_err(Failure::passthrough)?;

    Ok(Json(json!({ "count": users.len(), "users": users })))
}

/// Store the body as-is
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let user = state
        .db
        .insert("users", &body, Key::Anon)
        .await
        .map_err(Failure::passthrough)?
        .into_iter()
        .next()
        .unwrap_or(body);

    Ok(Json(json!({ "success": true, "user": user })))
}
