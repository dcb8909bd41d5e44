//! Request bodies and their validation rules.
//!
//! Bodies derive `validator::Validate`; [`check`] turns the first failing
//! rule into a 400 [`Failure`].

use crate::error::Failure;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

const MAX_ID_LEN: usize = 128;

/// Validate `body`, reporting the first failing field
pub fn check<T: Validate>(body: &T) -> Result<(), Failure> {
    let errors = match body.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let mut fields: Vec<(String, Option<Cow<'static, str>>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| (field.to_string(), errs.first().and_then(|e| e.message.clone())))
        .collect();
    fields.sort();

    let message = fields
        .into_iter()
        .next()
        .map(|(field, message)| {
            message.map_or_else(|| format!("Invalid {}", field), |m| m.into_owned())
        })
        .unwrap_or_else(|| "Invalid input provided".to_string());

    Err(Failure::bad_request(message))
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// `local@domain.tld` without whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// `[A-Za-z0-9_-]{1,128}`
pub fn is_valid_id(id: &str) -> bool {
    (1..=MAX_ID_LEN).contains(&id.len()) && id.chars().all(is_id_char)
}

/// `[A-Za-z0-9_-]{3,50}`
pub fn is_valid_username(name: &str) -> bool {
    (3..=50).contains(&name.len()) && name.chars().all(is_id_char)
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(invalid("email", "Invalid email format"))
    }
}

fn validate_id(id: &str) -> Result<(), ValidationError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(invalid("id", "Invalid identifier"))
    }
}

fn validate_username(name: &str) -> Result<(), ValidationError> {
    if is_valid_username(name) {
        Ok(())
    } else {
        Err(invalid(
            "username",
            "Username must be 3-50 letters, digits, '_' or '-'",
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        required(message = "Email is required"),
        custom(function = "validate_email")
    )]
    pub email: Option<String>,
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "Email is required"),
        custom(function = "validate_email")
    )]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GoogleSignInRequest {
    #[validate(
        required(message = "Missing credential"),
        length(min = 1, max = 9999, message = "Missing credential")
    )]
    pub credential: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartGameRequest {
    #[validate(custom(function = "validate_id"))]
    pub user_id: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteGameRequest {
    #[validate(custom(function = "validate_id"))]
    pub user_id: Option<String>,
    #[validate(custom(function = "validate_id"))]
    pub session_id: Option<String>,
    #[serde(default = "default_completion_time")]
    pub completion_time: i64,
    #[serde(default = "default_total_score")]
    pub total_score: i64,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_rooms_completed")]
    pub rooms_completed: i64,
    #[serde(default)]
    pub hints_used: i64,
    #[serde(default)]
    pub current_games_completed: i64,
    #[serde(default)]
    pub current_total_score: i64,
    #[serde(default)]
    pub current_total_playtime: i64,
}

fn default_completion_time() -> i64 {
    300
}

fn default_total_score() -> i64 {
    1000
}

fn default_difficulty() -> String {
    "easy".to_string()
}

fn default_rooms_completed() -> i64 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveProgressRequest {
    #[validate(
        required(message = "Session ID required"),
        custom(function = "validate_id")
    )]
    pub session_id: Option<String>,
    #[serde(default)]
    pub current_room: Option<String>,
    #[serde(default)]
    pub room_times: Map<String, Value>,
    #[serde(default)]
    pub room_attempts: Map<String, Value>,
    #[serde(default)]
    pub room_scores: Map<String, Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MeasurementRequest {
    #[validate(custom(function = "validate_id"))]
    pub session_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub measurement_type: Option<String>,
    #[serde(default)]
    pub measurement_data: Option<Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UnlockAchievementRequest {
    #[serde(default)]
    pub achievement_id: Option<String>,
    #[validate(custom(function = "validate_id"))]
    pub session_id: Option<String>,
    #[validate(custom(function = "validate_id"))]
    pub user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn body<T: serde::de::DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_emails() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@example."));
    }

    #[test]
    fn test_ids_and_usernames() {
        assert!(is_valid_id("a"));
        assert!(is_valid_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"x".repeat(129)));
        assert!(!is_valid_id("1 OR 1=1"));

        assert!(is_valid_username("ada_99"));
        assert!(!is_valid_username("ad"));
        assert!(!is_valid_username("ada.lovelace"));
    }

    #[test]
    fn test_check_reports_required_email() {
        let err = check(&body::<SignupRequest>(json!({"username": "ada"}))).unwrap_err();
        assert_eq!(err.message, "Email is required");

        let err = check(&body::<LoginRequest>(json!({"email": "nope"}))).unwrap_err();
        assert_eq!(err.message, "Invalid email format");

        assert!(check(&body::<LoginRequest>(json!({"email": "ada@example.com"}))).is_ok());
    }

    #[test]
    fn test_credential_length() {
        let err = check(&body::<GoogleSignInRequest>(json!({"credential": ""}))).unwrap_err();
        assert_eq!(err.message, "Missing credential");

        let long = "x".repeat(10_000);
        assert!(check(&body::<GoogleSignInRequest>(json!({"credential": long}))).is_err());
        assert!(check(&body::<GoogleSignInRequest>(json!({"credential": "abc"}))).is_ok());
    }

    #[test]
    fn test_complete_game_defaults() {
        let req: CompleteGameRequest = body(json!({"user_id": "u1"}));
        assert_eq!(req.completion_time, 300);
        assert_eq!(req.total_score, 1000);
        assert_eq!(req.difficulty, "easy");
        assert_eq!(req.rooms_completed, 1);
        assert_eq!(req.hints_used, 0);
        assert!(check(&req).is_ok());
    }

    #[test]
    fn test_bad_session_id_rejected() {
        let req: SaveProgressRequest = body(json!({"session_id": "a/b"}));
        assert_eq!(check(&req).unwrap_err().message, "Invalid identifier");
    }

    proptest! {
        #[test]
        fn prop_generated_ids_are_valid(id in "[A-Za-z0-9_-]{1,128}") {
            prop_assert!(is_valid_id(&id));
        }

        #[test]
        fn prop_whitespace_breaks_emails(local in "[a-z]{1,8}", ws in "[ \t\n]") {
            let email = format!("{}{}@example.com", local, ws);
            prop_assert!(!is_valid_email(&email));
        }
    }
}
