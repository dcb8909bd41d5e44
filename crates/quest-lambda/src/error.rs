//! Error types for the invocation adapter

use quest_core::GatewayError;
use thiserror::Error;

pub type Result<T, E = AdapterError> = std::result::Result<T, E>;

/// Runtime failure while handling one invocation.
///
/// Always terminal for the invocation; the entry point turns it into a 500
/// response.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The event payload did not have the expected shape
    #[error("invalid invocation event")]
    Event(#[from] serde_json::Error),

    /// The application broke the invocation contract or failed
    #[error(transparent)]
    Contract(#[from] GatewayError),

    /// The application returned without starting its response
    #[error("application returned without calling start_response")]
    MissingStart,

    /// The status line does not lead with a numeric code
    #[error("malformed status line: {0:?}")]
    MalformedStatus(String),

    /// The response body is not valid UTF-8
    #[error("response body is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The application panicked
    #[error("application panicked: {0}")]
    Panicked(String),
}

/// The embedded application could not be located or loaded.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct BindError {
    /// Why loading failed
    pub reason: String,
    /// Where the loader looked, reported back to the caller
    pub lookup_path: String,
}

impl BindError {
    pub fn new(reason: impl Into<String>, lookup_path: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            lookup_path: lookup_path.into(),
        }
    }
}

/// Render an error with every source in its chain, outermost first
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_errors_are_transparent() {
        let err = AdapterError::from(GatewayError::AlreadyStarted);
        assert_eq!(err.to_string(), "start_response called more than once");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let utf8 = String::from_utf8(vec![0xff]).unwrap_err();
        let err = AdapterError::from(utf8);
        let chain = error_chain(&err);
        assert_eq!(err.to_string(), "response body is not valid UTF-8");
        assert!(chain.starts_with("response body is not valid UTF-8: "));
        assert_eq!(chain.matches("invalid utf-8").count(), 1);
    }

    #[test]
    fn test_bind_error_display_is_reason() {
        let err = BindError::new("SUPABASE_URL is not set", ".env; SUPABASE_URL");
        assert_eq!(err.to_string(), "SUPABASE_URL is not set");
        assert_eq!(err.lookup_path, ".env; SUPABASE_URL");
    }
}
