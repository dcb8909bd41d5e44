//! # Quest API
//!
//! The Quantum Quest game backend. Player accounts, leaderboards, game
//! sessions and achievements live in a hosted Supabase database reached
//! over its REST interface; this crate turns client requests into those
//! REST calls.
//!
//! The backend is a [`quest_core::App`] and is only ever driven through
//! [`quest_lambda`]: [`load`] builds it from the environment and is handed to
//! [`quest_lambda::InvocationHandler`] as the application loader.
//!
//! Writes that only decorate a response (leaderboard rows, `last_login`,
//! progress snapshots) are best-effort, see [`SideEffect`].

mod app;
pub mod config;
mod error;
pub mod google;
pub mod routes;
mod side_effect;
mod state;
pub mod supabase;
pub mod token;
pub mod validation;

pub use app::{build_app, load};
pub use config::{AppConfig, ConfigError, Environment};
pub use error::{Failure, Result};
pub use google::{GoogleIdentity, GoogleVerifier, VerifyError};
pub use side_effect::SideEffect;
pub use state::AppState;
pub use supabase::{SupabaseClient, SupabaseError};
