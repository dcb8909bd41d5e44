//! Achievements

use crate::error::{Failure, Result};
use crate::routes::now;
use crate::side_effect::SideEffect;
use crate::state::AppState;
use crate::supabase::{eq, Key};
use crate::token::user_id;
use crate::validation::{check, UnlockAchievementRequest};
use quest_core::{Json, State};
use serde_json::{json, Value};
use tracing::debug;

/// Owner of `session_id`, if the store knows it
async fn session_owner(state: &AppState, session_id: &str) -> Option<String> {
    let filters = [("id", eq(session_id)), ("select", "user_id".to_string())];
    match state.db.select_one("game_sessions", &filters).await {
        Ok(Some(session)) => {
            let owner = json!({ "id": session.get("user_id").cloned().unwrap_or(Value::Null) });
            Some(user_id(&owner)).filter(|id| id != "unknown")
        }
        Ok(None) => None,
        Err(err) => {
            debug!(error = %err, "Session owner lookup failed");
            None
        }
    }
}

/// Unlock for the given player, or for the owner of the given session
pub async fn unlock(
    State(state): State<AppState>,
    Json(body): Json<UnlockAchievementRequest>,
) -> Result<Json<Value>> {
    check(&body)?;

    let owner = match (&body.user_id, &body.session_id) {
        (Some(user_id), _) => Some(user_id.clone()),
        (None, Some(session_id)) => session_owner(&state, session_id).await,
        (None, None) => None,
    };
    let user_id = owner.ok_or_else(|| Failure::bad_request("User ID required"))?;
    let achievement = body.achievement_id.as_deref().unwrap_or("unknown");

    SideEffect::record(
        "achievement unlock",
        state
            .db
            .insert(
                "user_achievements",
                &json!({
                    "user_id": user_id,
                    "achievement_id": body.achievement_id,
                    "unlocked_at": now(),
                    "session_id": body.session_id,
                }),
                Key::Anon,
            )
            .await,
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("Achievement {} unlocked", achievement),
    })))
}
