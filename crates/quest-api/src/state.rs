//! Shared handler state

use crate::config::AppConfig;
use crate::google::GoogleVerifier;
use crate::supabase::{SupabaseClient, SupabaseError};
use reqwest::Client;
use std::sync::Arc;

/// Everything a handler needs, built once per process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SupabaseClient,
    pub google: GoogleVerifier,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, SupabaseError> {
        let http = Client::builder().timeout(config.http_timeout()).build()?;

        Ok(Self {
            db: SupabaseClient::with_client(http.clone(), &config),
            google: GoogleVerifier::new(http, &config),
            config: Arc::new(config),
        })
    }
}
