//! Best-effort writes
//!
//! Some writes must never change the response a client sees: the
//! leaderboard entry written at signup, `last_login` updates, session
//! progress. Their outcome is recorded as a [`SideEffect`] and failures are
//! logged at `warn`.

use std::fmt::Display;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Applied,
    Failed(String),
}

impl SideEffect {
    /// Record the outcome of the write named `effect`
    pub fn record<T, E: Display>(effect: &'static str, result: Result<T, E>) -> Self {
        match result {
            Ok(_) => SideEffect::Applied,
            Err(err) => Self::failed(effect, err),
        }
    }

    /// A write that could not even be attempted
    pub fn failed(effect: &'static str, reason: impl Display) -> Self {
        let reason = reason.to_string();
        warn!(effect, error = %reason, "Best-effort write failed");
        SideEffect::Failed(reason)
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, SideEffect::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        assert!(SideEffect::record("x", Ok::<_, String>(())).is_applied());
        assert_eq!(
            SideEffect::record("x", Err::<(), _>("timed out")),
            SideEffect::Failed("timed out".to_string())
        );
    }
}
