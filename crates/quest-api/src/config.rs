//! Process configuration loaded from the environment.
//!
//! An optional `.env` file is read first, then [`AppConfig`] is
//! deserialized from environment variables with `envy`. Field names map to
//! SCREAMING_SNAKE_CASE variables (`supabase_url` reads `SUPABASE_URL`).
//!
//! ```ignore
//! let dotenv = load_dotenv();
//! let config = AppConfig::from_env()?;
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Google's public token introspection endpoint
pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Variables consulted by [`AppConfig::from_env`]
pub const ENV_VARS: [&str; 8] = [
    "SUPABASE_URL",
    "SUPABASE_ANON_KEY",
    "SUPABASE_SERVICE_KEY",
    "GOOGLE_CLIENT_ID",
    "GOOGLE_TOKENINFO_URL",
    "QUEST_ENV",
    "LEADERBOARD_DEMO_FALLBACK",
    "HTTP_TIMEOUT_SECS",
];

/// Error type for configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    #[error("Configuration error")]
    Env(#[source] envy::Error),

    /// A required environment variable is missing or blank.
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
}

impl From<envy::Error> for ConfigError {
    fn from(err: envy::Error) -> Self {
        match err {
            envy::Error::MissingValue(field) => ConfigError::MissingVar(field.to_uppercase()),
            other => ConfigError::Env(other),
        }
    }
}

/// Deployment profile, read from `QUEST_ENV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Custom(String),
}

impl Environment {
    /// `production`/`prod` and `development`/`dev` are recognized; unset
    /// means development.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("production") | Some("prod") => Self::Production,
            Some("development") | Some("dev") | None => Self::Development,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Log level used when `RUST_LOG` is not set
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production | Self::Custom(_) => "info",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backend configuration.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    #[serde(default)]
    pub supabase_service_key: Option<String>,
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default = "default_tokeninfo_url")]
    pub google_tokeninfo_url: String,
    #[serde(default)]
    pub quest_env: Option<String>,
    #[serde(default = "default_demo_fallback")]
    pub leaderboard_demo_fallback: bool,
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_tokeninfo_url() -> String {
    DEFAULT_TOKENINFO_URL.to_string()
}

fn default_demo_fallback() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

impl AppConfig {
    /// Read and validate the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::from_env()?;
        config.validate()
    }

    /// Minimal configuration pointing at `supabase_url`
    pub fn new(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            supabase_anon_key: anon_key.into(),
            supabase_service_key: None,
            google_client_id: None,
            google_tokeninfo_url: default_tokeninfo_url(),
            quest_env: None,
            leaderboard_demo_fallback: default_demo_fallback(),
            http_timeout_secs: default_timeout_secs(),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.supabase_url.trim().is_empty() {
            return Err(ConfigError::MissingVar("SUPABASE_URL".to_string()));
        }
        if self.supabase_anon_key.trim().is_empty() {
            return Err(ConfigError::MissingVar("SUPABASE_ANON_KEY".to_string()));
        }
        Ok(self)
    }

    /// `{SUPABASE_URL}/rest/v1`
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url.trim_end_matches('/'))
    }

    /// Service key, or the anon key when none is configured
    pub fn service_key(&self) -> &str {
        self.supabase_service_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or(&self.supabase_anon_key)
    }

    pub fn environment(&self) -> Environment {
        Environment::from_value(self.quest_env.as_deref())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &"<redacted>")
            .field("supabase_service_key", &self.supabase_service_key.as_ref().map(|_| "<redacted>"))
            .field("google_client_id", &self.google_client_id)
            .field("google_tokeninfo_url", &self.google_tokeninfo_url)
            .field("quest_env", &self.quest_env)
            .field("leaderboard_demo_fallback", &self.leaderboard_demo_fallback)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

/// Load a `.env` file from the current directory or its parents.
///
/// Returns the path of the file that was loaded. A missing file is not an
/// error.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Where configuration is looked up, for error reports
pub fn lookup_path(dotenv: Option<&PathBuf>) -> String {
    let file = match dotenv {
        Some(path) => path.display().to_string(),
        None => std::env::current_dir()
            .map(|dir| dir.join(".env").display().to_string())
            .unwrap_or_else(|_| ".env".to_string()),
    };
    format!("{} (env: {})", file, ENV_VARS.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_with_defaults() {
        clear();
        env::set_var("SUPABASE_URL", "https://db.example.co/");
        env::set_var("SUPABASE_ANON_KEY", "anon");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.rest_url(), "https://db.example.co/rest/v1");
        assert_eq!(config.service_key(), "anon");
        assert!(config.leaderboard_demo_fallback);
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.google_tokeninfo_url, DEFAULT_TOKENINFO_URL);
        assert_eq!(config.environment(), Environment::Development);
        clear();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear();
        env::set_var("SUPABASE_URL", "https://db.example.co");
        env::set_var("SUPABASE_ANON_KEY", "anon");
        env::set_var("SUPABASE_SERVICE_KEY", "service");
        env::set_var("LEADERBOARD_DEMO_FALLBACK", "false");
        env::set_var("HTTP_TIMEOUT_SECS", "3");
        env::set_var("QUEST_ENV", "prod");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.service_key(), "service");
        assert!(!config.leaderboard_demo_fallback);
        assert_eq!(config.http_timeout_secs, 3);
        assert!(config.environment().is_production());
        clear();
    }

    #[test]
    #[serial]
    fn test_missing_url_is_reported_by_name() {
        clear();
        env::set_var("SUPABASE_ANON_KEY", "anon");

        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(&err, ConfigError::MissingVar(var) if var == "SUPABASE_URL"));
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: SUPABASE_URL"
        );
        clear();
    }

    #[test]
    #[serial]
    fn test_malformed_value_reports_cause_once() {
        clear();
        env::set_var("SUPABASE_URL", "https://db.example.co");
        env::set_var("SUPABASE_ANON_KEY", "anon");
        env::set_var("HTTP_TIMEOUT_SECS", "soon");

        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Env(_)));
        assert_eq!(err.to_string(), "Configuration error");

        let cause = std::error::Error::source(&err).unwrap().to_string();
        let chain = quest_lambda::error_chain(&err);
        assert_eq!(chain, format!("Configuration error: {}", cause));
        clear();
    }

    #[test]
    #[serial]
    fn test_blank_key_is_missing() {
        clear();
        env::set_var("SUPABASE_URL", "https://db.example.co");
        env::set_var("SUPABASE_ANON_KEY", "  ");

        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "SUPABASE_ANON_KEY"));
        clear();
    }

    #[test]
    fn test_environment_values() {
        assert_eq!(Environment::from_value(None), Environment::Development);
        assert_eq!(Environment::from_value(Some("production")), Environment::Production);
        assert_eq!(
            Environment::from_value(Some("staging")),
            Environment::Custom("staging".to_string())
        );
        assert_eq!(Environment::Production.default_log_level(), "info");
        assert_eq!(Environment::Development.default_log_level(), "debug");
    }

    #[test]
    fn test_debug_redacts_keys() {
        let mut config = AppConfig::new("https://db.example.co", "secret-anon");
        config.supabase_service_key = Some("secret-service".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-anon"));
        assert!(!debug.contains("secret-service"));
    }

    #[test]
    fn test_lookup_path_names_variables() {
        let path = lookup_path(Some(&PathBuf::from("/var/task/.env")));
        assert!(path.starts_with("/var/task/.env (env: SUPABASE_URL"));
        assert!(path.contains("HTTP_TIMEOUT_SECS"));
    }
}
