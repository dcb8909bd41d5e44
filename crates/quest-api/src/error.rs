//! Route-level failures

use crate::google::VerifyError;
use crate::supabase::SupabaseError;
use quest_core::{IntoResponse, Json, Response};
use reqwest::StatusCode;
use serde_json::json;
use std::fmt;

pub type Result<T, E = Failure> = std::result::Result<T, E>;

/// A failed request as the game client expects it:
/// `{"success": false, "error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: StatusCode,
    pub message: String,
}

impl Failure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// `Database error: N` with the store's own status, or 500 when the
    /// store could not be reached
    pub fn passthrough(err: SupabaseError) -> Self {
        match err.status() {
            Some(status) => Self::new(
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                format!("Database error: {}", status),
            ),
            None => Self::internal(err.to_string()),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for Failure {}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "Request failed");
        }
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

impl From<SupabaseError> for Failure {
    fn from(err: SupabaseError) -> Self {
        Failure::internal(err.to_string())
    }
}

impl From<VerifyError> for Failure {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::NotConfigured => {
                Failure::service_unavailable("Google sign-in is not configured")
            }
            VerifyError::Unavailable(source) => {
                Failure::internal(format!("Unexpected error: {}", source))
            }
            invalid => Failure::bad_request(format!("Invalid Google token: {}", invalid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_keeps_store_status() {
        let failure = Failure::passthrough(SupabaseError::Status {
            status: 403,
            body: "denied".to_string(),
        });
        assert_eq!(failure.status, StatusCode::FORBIDDEN);
        assert_eq!(failure.message, "Database error: 403");
    }

    #[test]
    fn test_verify_errors_map_to_statuses() {
        assert_eq!(
            Failure::from(VerifyError::NotConfigured).status,
            StatusCode::SERVICE_UNAVAILABLE
        );

        let failure = Failure::from(VerifyError::WrongAudience("other".to_string()));
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert!(failure.message.starts_with("Invalid Google token: "));
    }
}
