// ── Device mirror ──
//
// Read-mostly mirror of the backend's device inventory. Polls replace the
// whole map; realtime status pushes patch single entries in place. Unlike
// alerts there is no local mutation to reconcile, so a concurrent map plus
// a published snapshot is enough.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::model::Device;

pub struct DeviceMirror {
    by_id: DashMap<String, Arc<Device>>,
    snapshot: watch::Sender<Arc<Vec<Arc<Device>>>>,
    /// Guards replace ordering the same way the alert board's sequence
    /// does: a straggling fetch must not clobber a newer one.
    last_seq: Mutex<u64>,
}

impl Default for DeviceMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceMirror {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            snapshot,
            last_seq: Mutex::new(0),
        }
    }

    /// Replace the mirror with a fetched inventory. Stale sequence numbers
    /// are rejected; returns whether the snapshot was applied.
    pub fn replace_all(&self, incoming: Vec<Device>, seq: u64) -> bool {
        let mut last_seq = self.lock_seq();
        if seq <= *last_seq {
            debug!(seq, last_seq = *last_seq, "discarding stale device snapshot");
            return false;
        }
        *last_seq = seq;

        self.by_id.clear();
        for device in incoming {
            self.by_id.insert(device.id.clone(), Arc::new(device));
        }
        self.publish();
        true
    }

    /// Patch one device in place, e.g. from a realtime status push.
    ///
    /// Returns the updated entry, or `None` for an unknown id (pushes for
    /// devices the mirror has not seen yet are dropped, not inserted --
    /// the next poll carries the full record).
    pub fn patch(&self, device_id: &str, apply: impl FnOnce(&mut Device)) -> Option<Arc<Device>> {
        let updated = {
            let mut entry = self.by_id.get_mut(device_id)?;
            let mut device = (**entry.value()).clone();
            apply(&mut device);
            let device = Arc::new(device);
            *entry.value_mut() = Arc::clone(&device);
            device
        };
        self.publish();
        Some(updated)
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<Device>> {
        self.by_id.get(device_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Display name for a device id, used to resolve alert references.
    pub fn display_name(&self, device_id: &str) -> Option<String> {
        self.get(device_id).map(|device| device.name.clone())
    }

    /// Current snapshot, sorted by device name for stable rendering.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Device>>>> {
        self.snapshot.subscribe()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn publish(&self) {
        let mut devices: Vec<Arc<Device>> = self
            .by_id
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        self.snapshot.send_replace(Arc::new(devices));
    }

    fn lock_seq(&self) -> std::sync::MutexGuard<'_, u64> {
        self.last_seq.lock().expect("device mirror mutex poisoned")
    }
}
