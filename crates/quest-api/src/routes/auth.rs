//! Sign-up and sign-in
//!
//! Tokens are opaque digests handed to the client; nothing here checks them
//! on later requests.

use crate::error::{Failure, Result};
use crate::google::GoogleIdentity;
use crate::routes::{initial_leaderboard_entry, now};
use crate::side_effect::SideEffect;
use crate::state::AppState;
use crate::supabase::{eq, Key, SupabaseError};
use crate::token::{generate_username, user_id, TokenGrant};
use crate::validation::{check, GoogleSignInRequest, LoginRequest, SignupRequest};
use quest_core::{Json, State};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::info;

const USERNAME_ATTEMPTS: usize = 20;

/// Default stats for a new player
fn new_user_record(
    email: &str,
    username: &str,
    full_name: &str,
    google: Option<&GoogleIdentity>,
) -> Value {
    let mut user = json!({
        "email": email,
        "username": username,
        "full_name": full_name,
        "created_at": now(),
        "is_verified": true,
        "is_premium": false,
        "total_playtime": 0,
        "games_completed": 0,
        "best_completion_time": null,
        "total_score": 0,
        "quantum_mastery_level": 1,
        "is_active": true,
        "preferences": {},
    });
    if let (Some(identity), Some(fields)) = (google, user.as_object_mut()) {
        fields.insert("avatar_url".to_string(), json!(identity.picture));
        fields.insert("auth_provider".to_string(), json!("google"));
    }
    user
}

/// `user` plus a fresh token, with any extra fields
fn signed_in(user: Value, extra: Value) -> Value {
    let grant = TokenGrant::for_user(&user);
    let mut body = json!({
        "success": true,
        "user": user,
        "access_token": grant.access_token,
        "token_type": grant.token_type,
        "expires_in": grant.expires_in,
    });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    body
}

fn create_failure(err: SupabaseError) -> Failure {
    match err.status() {
        Some(status) => Failure::internal(format!("Failed to create user. Status: {}", status)),
        None => Failure::internal(format!("Signup failed: {}", err)),
    }
}

/// First stored user
pub async fn current_user(State(state): State<AppState>) -> Result<Json<Value>> {
    let user = state
        .db
        .select_one("users", &[("limit", "1".to_string())])
        .await
        .map_err(|err| Failure::internal(format!("Failed to get user: {}", err)))?
        .ok_or_else(|| Failure::not_found("No user found"))?;

    Ok(Json(json!({ "user": user })))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<Value>> {
    check(&body)?;
    let email = body.email.unwrap_or_default();
    let username = body
        .username
        .unwrap_or_else(|| email.split('@').next().unwrap_or("player").to_string());
    let full_name = body.full_name.unwrap_or_default();

    if let Ok(Some(_)) = state.db.select_one("users", &[("email", eq(&email))]).await {
        return Err(Failure::bad_request("User already exists"));
    }

    let record = new_user_record(&email, &username, &full_name, None);
    let user = state
        .db
        .insert("users", &record, Key::Anon)
        .await
        .map_err(create_failure)?
        .into_iter()
        .next()
        .unwrap_or(record);

    SideEffect::record(
        "initial leaderboard entry",
        state
            .db
            .insert("leaderboard_entries", &initial_leaderboard_entry(&user["id"]), Key::Anon)
            .await,
    );

    info!(username = %username, "Player signed up");
    Ok(Json(signed_in(
        user,
        json!({ "message": "Account created successfully!" }),
    )))
}

/// Also served as `/api/auth/signin`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>> {
    check(&body)?;
    let email = body.email.unwrap_or_default();

    let user = state
        .db
        .select_one("users", &[("email", eq(&email))])
        .await
        .map_err(|_| Failure::internal("Database connection failed"))?
        .ok_or_else(|| Failure::not_found("User not found"))?;

    SideEffect::record(
        "last_login update",
        state
            .db
            .update("users", &[("id", eq(user_id(&user)))], &json!({ "last_login": now() }))
            .await,
    );

    Ok(Json(signed_in(user, json!({}))))
}

async fn unique_username(state: &AppState, email: &str) -> Result<String> {
    for _ in 0..USERNAME_ATTEMPTS {
        let candidate = generate_username(email, &mut rand::thread_rng());
        match state.db.select_one("users", &[("username", eq(&candidate))]).await {
            Ok(Some(_)) => continue,
            _ => return Ok(candidate),
        }
    }
    Err(Failure::internal("Could not generate a unique username"))
}

pub async fn google(
    State(state): State<AppState>,
    Json(body): Json<GoogleSignInRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    check(&body)?;
    let credential = body.credential.unwrap_or_default();
    let identity = state.google.verify(&credential).await?;

    if let Ok(Some(user)) = state
        .db
        .select_one("users", &[("email", eq(&identity.email))])
        .await
    {
        return Ok((
            StatusCode::OK,
            Json(signed_in(user, json!({ "message": "Google login successful" }))),
        ));
    }

    let username = unique_username(&state, &identity.email).await?;
    let record = new_user_record(&identity.email, &username, &identity.name, Some(&identity));
    let user = state
        .db
        .insert("users", &record, Key::Service)
        .await
        .map_err(create_failure)?
        .into_iter()
        .next()
        .unwrap_or(record);

    SideEffect::record(
        "initial leaderboard entry",
        state
            .db
            .insert("leaderboard_entries", &initial_leaderboard_entry(&user["id"]), Key::Service)
            .await,
    );

    info!(username = %username, "Player signed up with Google");
    Ok((
        StatusCode::CREATED,
        Json(signed_in(user, json!({ "message": "Google account created" }))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = new_user_record("ada@example.com", "ada", "", None);
        assert_eq!(user["total_score"], 0);
        assert_eq!(user["quantum_mastery_level"], 1);
        assert_eq!(user["preferences"], json!({}));
        assert!(user.get("auth_provider").is_none());
    }

    #[test]
    fn test_google_user_fields() {
        let identity = GoogleIdentity {
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            picture: "https://img.example/ada.png".to_string(),
        };
        let user = new_user_record("ada@example.com", "ada_1234", "Ada", Some(&identity));
        assert_eq!(user["auth_provider"], "google");
        assert_eq!(user["avatar_url"], "https://img.example/ada.png");
    }

    #[test]
    fn test_signed_in_merges_extra() {
        let body = signed_in(json!({"id": "u1"}), json!({"message": "hi"}));
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "hi");
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["access_token"].as_str().unwrap().len(), 64);
    }
}
