//! Route table and application loading

use crate::config::{load_dotenv, lookup_path, AppConfig, ConfigError};
use crate::routes::{achievements, auth, game, health, leaderboard, quantum, users};
use crate::state::AppState;
use quest_core::{get, post, App};
use quest_lambda::{error_chain, BindError};
use tracing::info;

/// Assemble the backend around `state`
pub fn build_app(state: AppState) -> App {
    App::new()
        .state(state)
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/v1/models", get(health::models))
        .route("/api/game/rooms", get(game::rooms))
        .route("/api/test-supabase", get(health::test_supabase))
        .route("/api/auth/user", get(auth::current_user))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signin", post(auth::login))
        .route("/api/auth/google", post(auth::google))
        .route("/api/leaderboard/score", get(leaderboard::score))
        .route("/api/leaderboard/speed", get(leaderboard::speed))
        .route("/api/game/start", post(game::start))
        .route("/api/game/complete", post(game::complete))
        .route("/api/game/save-progress", post(game::save_progress))
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/quantum/measurements", post(quantum::record_measurement))
        .route("/api/achievements/unlock", post(achievements::unlock))
}

/// Build the backend from the process environment.
///
/// Configuration problems are reported as a [`BindError`] naming the
/// `.env` file consulted and the variables read.
pub fn load() -> Result<App, BindError> {
    let dotenv = load_dotenv();
    let bind_error = |reason: String| BindError::new(reason, lookup_path(dotenv.as_ref()));

    let config =
        AppConfig::from_env().map_err(|err: ConfigError| bind_error(error_chain(&err)))?;
    info!(
        environment = %config.environment(),
        rest_url = %config.rest_url(),
        google_sign_in = config.google_client_id.is_some(),
        "Configuration loaded"
    );

    let state = AppState::new(config)
        .map_err(|err| bind_error(format!("HTTP client setup failed: {}", err)))?;
    Ok(build_app(state))
}
