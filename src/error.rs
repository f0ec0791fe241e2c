//! Error types for fleet operations.
//!
//! Every failure that crosses the facade is a `FleetError` so presentation layers can
//! phrase not-found, busy and runtime failures differently.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::model::ComposeAction;

/// Result type alias for fleet operations.
pub type Result<T> = std::result::Result<T, FleetError>;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("App not found: {name}")]
    NotFound { name: String },

    #[error("An action is already in progress for {name}")]
    InFlight { name: String },

    #[error("Failed to {action} {name} (exit code {exit_code}): {stderr}")]
    ActionFailed {
        name: String,
        action: ComposeAction,
        exit_code: i32,
        stderr: String,
    },

    #[error("Timed out after {} waiting for {action} on {name}", humantime::format_duration(*after))]
    Timeout {
        name: String,
        action: ComposeAction,
        after: Duration,
    },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {}: {source}", root.display())]
    Discovery {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FleetError {
    /// Stable machine-readable tag for presentation layers and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            FleetError::NotFound { .. } => "not_found",
            FleetError::InFlight { .. } => "in_flight",
            FleetError::ActionFailed { .. } => "action_failed",
            FleetError::Timeout { .. } => "timeout",
            FleetError::Spawn { .. } => "spawn_failed",
            FleetError::Discovery { .. } => "discovery_failed",
        }
    }

    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        FleetError::NotFound { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_is_human_readable() {
        let err = FleetError::Timeout {
            name: "web".into(),
            action: ComposeAction::Up,
            after: Duration::from_secs(90),
        };
        assert_eq!(err.kind(), "timeout");
        assert_eq!(
            err.to_string(),
            "Timed out after 1m 30s waiting for up on web"
        );
    }

    #[test]
    fn test_action_failure_carries_stderr() {
        let err = FleetError::ActionFailed {
            name: "db".into(),
            action: ComposeAction::Down,
            exit_code: 1,
            stderr: "network in use".into(),
        };
        assert_eq!(err.kind(), "action_failed");
        assert!(err.to_string().contains("network in use"));
    }
}
