// ── Dashboard state store ──

mod alerts;
mod collection;
pub mod view;

use std::sync::atomic::{AtomicU64, Ordering};

pub use alerts::{AckOutcome, AlertBoard};
pub use collection::DeviceMirror;
pub use view::{AlertPage, AlertQuery, SeverityFilter, SortDir, SortKey, Tab};

use crate::model::{Alert, Device};
use crate::stream::EntityStream;

/// Shared state behind the monitor: the alert board, the device mirror,
/// and the fetch sequencer that orders their snapshot replaces.
#[derive(Default)]
pub struct DashboardStore {
    pub alerts: AlertBoard,
    pub devices: DeviceMirror,
    fetch_seq: AtomicU64,
}

impl DashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a fetch about to be issued. The number is taken before the
    /// request goes out, so whichever fetch was issued last wins the
    /// replace regardless of completion order.
    pub fn next_fetch_seq(&self) -> u64 {
        self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reactive subscription to alert snapshot changes.
    pub fn subscribe_alerts(&self) -> EntityStream<Alert> {
        EntityStream::new(self.alerts.subscribe())
    }

    /// Reactive subscription to device snapshot changes.
    pub fn subscribe_devices(&self) -> EntityStream<Device> {
        EntityStream::new(self.devices.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_sequence_is_monotonic_and_starts_above_zero() {
        let store = DashboardStore::new();
        let first = store.next_fetch_seq();
        let second = store.next_fetch_seq();
        assert_eq!(first, 1);
        assert!(second > first);
    }
}
