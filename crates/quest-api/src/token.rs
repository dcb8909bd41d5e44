//! Access tokens and generated usernames

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, Rng, RngCore};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Lifetime advertised to clients, in seconds
pub const TOKEN_TTL_SECS: u64 = 86_400;

/// Token fields merged into every successful sign-in response
#[derive(Debug, Clone, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl TokenGrant {
    pub fn for_user(user: &Value) -> Self {
        Self {
            access_token: generate_access_token(&user_id(user)),
            token_type: "Bearer",
            expires_in: TOKEN_TTL_SECS,
        }
    }
}

/// `id` of a stored user, `unknown` when the row has none
pub fn user_id(user: &Value) -> String {
    match user.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => "unknown".to_string(),
    }
}

/// SHA-256 hex digest of `<user_id>:<32 random bytes, URL-safe base64>`
pub fn generate_access_token(user_id: &str) -> String {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);

    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", user_id, URL_SAFE_NO_PAD.encode(secret)).as_bytes());

    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{:02x}", byte);
            hex
        })
}

/// `<local part>_<4 digits>`
pub fn generate_username<R: Rng + ?Sized>(email: &str, rng: &mut R) -> String {
    let local = email.split('@').next().unwrap_or(email);
    format!("{}_{:04}", local, rng.gen_range(0..10_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use serde_json::json;

    #[test]
    fn test_token_shape() {
        let token = generate_access_token("u1");
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, generate_access_token("u1"));
    }

    #[test]
    fn test_user_id_forms() {
        assert_eq!(user_id(&json!({"id": "abc"})), "abc");
        assert_eq!(user_id(&json!({"id": 7})), "7");
        assert_eq!(user_id(&json!({})), "unknown");
    }

    #[test]
    fn test_grant_fields() {
        let grant = serde_json::to_value(TokenGrant::for_user(&json!({"id": "u1"}))).unwrap();
        assert_eq!(grant["token_type"], "Bearer");
        assert_eq!(grant["expires_in"], 86400);
    }

    #[test]
    fn test_username_uses_local_part() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(generate_username("ada@example.com", &mut rng), "ada_0000");
    }

    proptest! {
        #[test]
        fn prop_username_suffix_is_four_digits(local in "[a-z0-9.]{1,20}", seed in any::<u64>()) {
            let mut rng = StepRng::new(seed, 7);
            let name = generate_username(&format!("{}@example.com", local), &mut rng);
            let (prefix, suffix) = name.rsplit_once('_').unwrap();
            prop_assert_eq!(prefix, local.as_str());
            prop_assert_eq!(suffix.len(), 4);
            prop_assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
