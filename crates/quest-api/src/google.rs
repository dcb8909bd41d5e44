//! Google ID token verification
//!
//! Credentials are checked against Google's tokeninfo endpoint: the token
//! must be accepted by Google, issued by `accounts.google.com`, addressed
//! to our client id and not yet expired.

use crate::config::AppConfig;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Google sign-in is not configured")]
    NotConfigured,

    #[error("token rejected by Google (status {0})")]
    Rejected(u16),

    #[error("token audience {0:?} does not match this application")]
    WrongAudience(String),

    #[error("wrong issuer {0:?}")]
    WrongIssuer(String),

    #[error("token expired")]
    Expired,

    #[error("token has no email address")]
    MissingEmail,

    #[error("token verification failed: {0}")]
    Unavailable(#[from] reqwest::Error),
}

/// Claims taken from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub email: String,
    pub name: String,
    pub picture: String,
}

/// tokeninfo returns every claim as a string
#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    aud: String,
    #[serde(default)]
    iss: String,
    #[serde(default)]
    exp: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleVerifier {
    http: Client,
    tokeninfo_url: String,
    client_id: Option<String>,
}

impl GoogleVerifier {
    pub fn new(http: Client, config: &AppConfig) -> Self {
        Self {
            http,
            tokeninfo_url: config.google_tokeninfo_url.clone(),
            client_id: config
                .google_client_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some()
    }

    pub async fn verify(&self, credential: &str) -> Result<GoogleIdentity, VerifyError> {
        let client_id = self.client_id.as_deref().ok_or(VerifyError::NotConfigured)?;

        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", credential)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(VerifyError::Rejected(response.status().as_u16()));
        }

        let info: TokenInfo = response.json().await?;
        check_claims(info, client_id, Utc::now().timestamp())
    }
}

fn check_claims(info: TokenInfo, client_id: &str, now: i64) -> Result<GoogleIdentity, VerifyError> {
    if info.aud != client_id {
        return Err(VerifyError::WrongAudience(info.aud));
    }
    if !ISSUERS.contains(&info.iss.as_str()) {
        return Err(VerifyError::WrongIssuer(info.iss));
    }
    let expires = info
        .exp
        .as_deref()
        .and_then(|exp| exp.parse::<i64>().ok())
        .ok_or(VerifyError::Expired)?;
    if expires <= now {
        return Err(VerifyError::Expired);
    }

    let email = info
        .email
        .filter(|email| !email.is_empty())
        .ok_or(VerifyError::MissingEmail)?;

    Ok(GoogleIdentity {
        email,
        name: info.name.unwrap_or_default(),
        picture: info.picture.unwrap_or_default(),
    })
}
