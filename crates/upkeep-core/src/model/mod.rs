// ── Domain model ──
//
// Canonical client-side types, converted from `upkeep_api` wire records by
// `crate::convert`. Wire concerns (string enums, naive timestamps, extra
// fields) stop at the conversion boundary.

mod alert;
mod device;
mod settings;
mod stats;

pub use alert::{Alert, SeverityBucket, SyncState};
pub use device::{Device, DeviceStatus};
pub use settings::{Notifications, Settings, ThresholdBand};
pub use stats::{AlertStats, TrendBucket};
