// upkeep-core: Reactive data layer between upkeep-api and consumers (CLI/dashboard).

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod monitor;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{MonitorConfig, TlsVerification};
pub use error::CoreError;
pub use monitor::{Monitor, MonitorEvent, MonitorState};
pub use store::{
    AckOutcome, AlertPage, AlertQuery, DashboardStore, SeverityFilter, SortDir, SortKey, Tab,
};
pub use stream::EntityStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Alert, AlertStats, Device, DeviceStatus, Notifications, SeverityBucket, Settings, SyncState,
    ThresholdBand, TrendBucket,
};

// Realtime channel state passes through monitor events; re-export it so
// consumers do not need a direct upkeep-api dependency.
pub use upkeep_api::{ChannelState, MessageKind};
