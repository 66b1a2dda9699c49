// ── Core error types ──
//
// User-facing errors from upkeep-core. Consumers never see HTTP status
// codes or JSON parse failures directly -- the `From<upkeep_api::Error>`
// impl translates transport-layer errors into domain-appropriate variants.
// Malformed individual records are not an error at all: they are dropped
// and logged inside the batch paths.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Monitor is not connected")]
    Disconnected,

    #[error("Backend request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    /// A poll failed; the previous mirror stays intact and the next
    /// scheduled interval retries.
    #[error("Refresh failed: {reason}")]
    FetchFailed { reason: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    /// Local precondition violation, caught before any network call.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The backend rejected an acknowledge (or the call failed); the
    /// optimistic local mutation has been rolled back.
    #[error("Failed to acknowledge alert {alert_id}: {reason}")]
    AcknowledgeFailed { alert_id: String, reason: String },

    /// The realtime channel spent its reconnect budget; an explicit
    /// reconnect is required.
    #[error("Realtime channel exhausted its reconnect attempts")]
    ChannelExhausted,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same operation later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. } | Self::ConnectionFailed { .. } | Self::Timeout { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<upkeep_api::Error> for CoreError {
    fn from(err: upkeep_api::Error) -> Self {
        match err {
            upkeep_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::FetchFailed {
                        reason: e.to_string(),
                    }
                }
            }
            upkeep_api::Error::Status { status: 404, url } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: url,
            },
            upkeep_api::Error::Status { status, url } => CoreError::FetchFailed {
                reason: format!("backend returned HTTP {status} for {url}"),
            },
            upkeep_api::Error::Deserialization { message, body: _ } => CoreError::FetchFailed {
                reason: format!("malformed backend response: {message}"),
            },
            upkeep_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            upkeep_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            upkeep_api::Error::ChannelConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("realtime channel: {reason}"),
            },
            upkeep_api::Error::ChannelExhausted => CoreError::ChannelExhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_maps_to_not_found() {
        let err: CoreError = upkeep_api::Error::Status {
            status: 404,
            url: "http://x/devices/nope".into(),
        }
        .into();
        assert!(err.is_not_found());
    }

    #[test]
    fn server_error_maps_to_retryable_fetch_failure() {
        let err: CoreError = upkeep_api::Error::Status {
            status: 502,
            url: "http://x/alerts".into(),
        }
        .into();
        assert!(matches!(err, CoreError::FetchFailed { .. }));
        assert!(err.is_retryable());
    }
}
