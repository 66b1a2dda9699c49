//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use upkeep_core::CoreError;

/// Exit codes per the CLI contract.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to backend at {url}")]
    #[diagnostic(
        code(upkeep::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             URL: {url}\n\
             Try: upkeep status --insecure"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(upkeep::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(upkeep::not_found),
        help("Run: upkeep {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Failed to acknowledge alert {alert_id}")]
    #[diagnostic(
        code(upkeep::acknowledge_failed),
        help(
            "The backend rejected the acknowledgement and the alert was\n\
             restored to its previous state. Reason: {reason}"
        )
    )]
    AcknowledgeFailed { alert_id: String, reason: String },

    #[error("Realtime channel exhausted its reconnect attempts")]
    #[diagnostic(
        code(upkeep::channel_exhausted),
        help("Run the command again to reconnect with a fresh retry budget.")
    )]
    ChannelExhausted,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(upkeep::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(upkeep::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: upkeep config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(upkeep::no_config),
        help(
            "Pass --server, set UPKEEP_SERVER, or create a profile with:\n\
             upkeep config init\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(upkeep::config))]
    Config(#[from] upkeep_config::ConfigError),

    // ── Generic fallthrough ──────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(upkeep::backend))]
    Backend(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(upkeep::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ChannelExhausted => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Disconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "Backend connection was lost".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{entity_type}s list"),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::AcknowledgeFailed { alert_id, reason } => {
                CliError::AcknowledgeFailed { alert_id, reason }
            }

            CoreError::ChannelExhausted => CliError::ChannelExhausted,

            CoreError::FetchFailed { reason } => CliError::Backend(reason),

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Backend(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_contract() {
        let not_found = CliError::NotFound {
            resource_type: "alert".into(),
            identifier: "a1".into(),
            list_command: "alerts list".into(),
        };
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let timeout = CliError::Timeout { seconds: 30 };
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let validation = CliError::Validation {
            field: "notes".into(),
            reason: "must not be empty".into(),
        };
        assert_eq!(validation.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn core_errors_map_to_cli_variants() {
        let err: CliError = CoreError::NotFound {
            entity_type: "alert".into(),
            identifier: "ghost".into(),
        }
        .into();
        assert!(matches!(err, CliError::NotFound { .. }));

        let err: CliError = CoreError::ChannelExhausted.into();
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }
}
