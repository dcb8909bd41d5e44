//! Supabase REST client
//!
//! Thin wrapper over PostgREST: every call targets
//! `{SUPABASE_URL}/rest/v1/{table}` and filters are passed as query
//! parameters in PostgREST syntax (`("email", "eq.ada@example.com")`).

use crate::config::AppConfig;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Which API key a request is signed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Anon,
    Service,
}

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("database request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("database returned status {status}")]
    Status { status: u16, body: String },

    #[error("database response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SupabaseError {
    /// HTTP status returned by the store, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Raw answer to a probe request
#[derive(Debug, Clone)]
pub struct Probe {
    pub status: u16,
    pub body: String,
}

impl Probe {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    rest_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn with_client(http: Client, config: &AppConfig) -> Self {
        Self {
            http,
            rest_url: config.rest_url(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.service_key().to_string(),
        }
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn request(&self, method: Method, table: &str, key: Key) -> RequestBuilder {
        let key = match key {
            Key::Anon => &self.anon_key,
            Key::Service => &self.service_key,
        };
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
    }

    /// `GET /{table}` with the given filters
    pub async fn select(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<Value>, SupabaseError> {
        debug!(table, ?filters, "select");
        let response = self
            .request(Method::GET, table, Key::Anon)
            .query(filters)
            .send()
            .await?;
        rows(response).await
    }

    /// First row matching `filters`, if any
    pub async fn select_one(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<Value>, SupabaseError> {
        Ok(self.select(table, filters).await?.into_iter().next())
    }

    /// `POST /{table}`; returns the stored representation
    pub async fn insert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &T,
        key: Key,
    ) -> Result<Vec<Value>, SupabaseError> {
        debug!(table, ?key, "insert");
        let response = self
            .request(Method::POST, table, key)
            .json(body)
            .send()
            .await?;
        rows(response).await
    }

    /// `PATCH /{table}` on the rows matching `filters`
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &T,
    ) -> Result<Vec<Value>, SupabaseError> {
        debug!(table, ?filters, "update");
        let response = self
            .request(Method::PATCH, table, Key::Anon)
            .query(filters)
            .json(body)
            .send()
            .await?;
        rows(response).await
    }

    /// `GET /{table}` returning whatever came back, whatever the status
    pub async fn probe(
        &self,
        table: &str,
        filters: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<Probe, SupabaseError> {
        let mut request = self.request(Method::GET, table, Key::Anon).query(filters);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Probe { status, body })
    }
}

/// `eq.<value>` filter
pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

async fn rows(response: Response) -> Result<Vec<Value>, SupabaseError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(SupabaseError::Status {
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&body)? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        row => Ok(vec![row]),
    }
}
