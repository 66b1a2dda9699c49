// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The monitor
// routes each variant to the matching backend call, applying optimistic
// state and rollback where the operation calls for it.

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{Alert, Settings};

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All operations the dashboard can perform against the backend.
#[derive(Debug, Clone)]
pub enum Command {
    /// Resolve an alert with mandatory notes. Applied optimistically and
    /// rolled back if the backend rejects it.
    AcknowledgeAlert { alert_id: String, notes: String },

    /// Replace the threshold and notification settings.
    UpdateSettings { settings: Settings },

    /// Fetch the current settings from the backend.
    FetchSettings,

    /// Re-poll devices and alerts immediately, outside the timers.
    Refresh,

    /// Re-poll alerts only.
    RefreshAlerts,

    /// Tear down the realtime channel and start a fresh one. The only way
    /// out of a terminal exhausted channel.
    ReconnectRealtime,
}

/// Result of a command execution.
#[derive(Debug)]
pub enum CommandResult {
    Ok,
    Alert(Arc<Alert>),
    Settings(Settings),
}
