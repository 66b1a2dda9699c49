// ── Alert board ──
//
// The reconciliation point between three writers: poll snapshots from the
// REST API, optimistic acknowledge mutations from the user, and their
// confirmations or rollbacks. All three funnel through one mutex so every
// published snapshot reflects a single consistent interleaving.
//
// Readers never touch the mutex: the board publishes `Arc<Vec<Arc<Alert>>>`
// snapshots through a watch channel, and all derived data (filtered views,
// statistics, trend buckets) is recomputed from a snapshot on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Alert, AlertStats, SeverityBucket, SyncState, TrendBucket};
use crate::store::view::{self, AlertPage, AlertQuery};

/// How a confirming acknowledge request ended.
#[derive(Debug, Clone)]
pub enum AckOutcome {
    /// The backend accepted the acknowledge. Carries the authoritative
    /// record when the backend returned one, or `None` for a bare
    /// confirmation (the optimistic local state is kept as-is).
    Confirmed(Option<Alert>),
    /// The request failed; the alert reverts to its pre-mutation snapshot.
    Failed,
}

struct BoardInner {
    order: Vec<Arc<Alert>>,
    /// id -> position in `order`. Rebuilt on replace, patched on mutate.
    index: HashMap<String, usize>,
    /// Sequence number of the last applied snapshot; replaces carrying a
    /// number at or below this are stale and rejected.
    last_seq: u64,
}

impl BoardInner {
    fn publish(&self, snapshot: &watch::Sender<Arc<Vec<Arc<Alert>>>>) {
        snapshot.send_replace(Arc::new(self.order.clone()));
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}

pub struct AlertBoard {
    inner: Mutex<BoardInner>,
    snapshot: watch::Sender<Arc<Vec<Arc<Alert>>>>,
}

impl Default for AlertBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertBoard {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Mutex::new(BoardInner {
                order: Vec::new(),
                index: HashMap::new(),
                last_seq: 0,
            }),
            snapshot,
        }
    }

    /// Replace the whole collection with a fetched snapshot.
    ///
    /// `seq` is the fetch sequence number stamped when the request was
    /// issued, not when it completed. A snapshot whose number is at or
    /// below the last applied one lost the race to a newer fetch and is
    /// discarded, so slow responses can never clobber fresh state.
    ///
    /// Alerts with an acknowledge in flight keep their optimistic local
    /// state; the incoming record for them is ignored until the in-flight
    /// request settles.
    ///
    /// Returns whether the snapshot was applied.
    pub fn replace_all(&self, incoming: Vec<Alert>, seq: u64) -> bool {
        let mut inner = self.lock();
        if seq <= inner.last_seq {
            debug!(seq, last_seq = inner.last_seq, "discarding stale alert snapshot");
            return false;
        }

        let mut order: Vec<Arc<Alert>> = Vec::with_capacity(incoming.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(incoming.len());
        for alert in incoming {
            if index.contains_key(&alert.id) {
                warn!(alert_id = %alert.id, "duplicate alert id in snapshot, keeping first");
                continue;
            }
            let kept = match inner.position(&alert.id) {
                // Optimistic state wins over the poll until it settles.
                Some(pos) if inner.order[pos].sync.is_pending() => Arc::clone(&inner.order[pos]),
                _ => Arc::new(alert),
            };
            index.insert(kept.id.clone(), order.len());
            order.push(kept);
        }

        inner.order = order;
        inner.index = index;
        inner.last_seq = seq;
        inner.publish(&self.snapshot);
        true
    }

    /// Apply the optimistic half of an acknowledge.
    ///
    /// Validates first; on any error the board is untouched and the caller
    /// must not issue the network request. On success the alert is shown
    /// acknowledged immediately, tagged with its pre-mutation snapshot so
    /// [`AlertBoard::complete_acknowledge`] can confirm or roll back.
    pub fn begin_acknowledge(
        &self,
        alert_id: &str,
        notes: &str,
    ) -> Result<Arc<Alert>, CoreError> {
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(CoreError::Validation {
                message: "resolution notes must not be empty".into(),
            });
        }

        let mut inner = self.lock();
        let pos = inner.position(alert_id).ok_or_else(|| CoreError::NotFound {
            entity_type: "alert".into(),
            identifier: alert_id.into(),
        })?;

        let current = &inner.order[pos];
        if current.sync.is_pending() {
            return Err(CoreError::Validation {
                message: format!("alert {alert_id} already has an acknowledgement in flight"),
            });
        }
        if current.acknowledged {
            return Err(CoreError::Validation {
                message: format!("alert {alert_id} is already resolved"),
            });
        }

        let prior = (**current).clone();
        let mut updated = prior.clone();
        updated.acknowledged = true;
        updated.resolution_notes = Some(notes.to_owned());
        updated.resolution_timestamp = Some(Utc::now());
        updated.sync = SyncState::PendingAcknowledge(Box::new(prior));

        let updated = Arc::new(updated);
        inner.order[pos] = Arc::clone(&updated);
        inner.publish(&self.snapshot);
        Ok(updated)
    }

    /// Settle an in-flight acknowledge.
    ///
    /// `Confirmed(Some(record))` adopts the backend's authoritative record;
    /// `Confirmed(None)` keeps the optimistic state and clears the tag;
    /// `Failed` restores the stored pre-mutation snapshot bit for bit.
    ///
    /// Returns the settled alert, or `None` when the alert no longer has a
    /// pending tag (e.g. a later snapshot removed it from the collection).
    pub fn complete_acknowledge(
        &self,
        alert_id: &str,
        outcome: AckOutcome,
    ) -> Option<Arc<Alert>> {
        let mut inner = self.lock();
        let pos = inner.position(alert_id)?;

        let SyncState::PendingAcknowledge(prior) = inner.order[pos].sync.clone() else {
            debug!(alert_id, "acknowledge completion with no pending tag, ignoring");
            return None;
        };

        let settled = match outcome {
            AckOutcome::Confirmed(Some(mut record)) => {
                record.sync = SyncState::Synced;
                record
            }
            AckOutcome::Confirmed(None) => {
                let mut kept = (*inner.order[pos]).clone();
                kept.sync = SyncState::Synced;
                kept
            }
            AckOutcome::Failed => *prior,
        };

        let settled = Arc::new(settled);
        inner.order[pos] = Arc::clone(&settled);
        inner.publish(&self.snapshot);
        Some(settled)
    }

    /// Current snapshot, cheap to clone and safe to hold across awaits.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Alert>>> {
        self.snapshot.borrow().clone()
    }

    /// Watch the published snapshots; fires on every applied mutation.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Alert>>>> {
        self.snapshot.subscribe()
    }

    pub fn get(&self, alert_id: &str) -> Option<Arc<Alert>> {
        let inner = self.lock();
        inner.position(alert_id).map(|pos| Arc::clone(&inner.order[pos]))
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    pub fn last_seq(&self) -> u64 {
        self.lock().last_seq
    }

    /// Compute a filtered, sorted, paginated view of the current snapshot.
    pub fn filtered_view(&self, query: &AlertQuery) -> AlertPage {
        view::filtered_view(&self.snapshot(), query)
    }

    /// Severity-bucketed counts over the full collection.
    ///
    /// Always a full recount of the snapshot. Open alerts land in their
    /// score bucket; acknowledged alerts count as resolved regardless of
    /// severity, so the two partitions never overlap.
    pub fn statistics(&self) -> AlertStats {
        let snapshot = self.snapshot();
        let mut stats = AlertStats::default();
        for alert in &*snapshot {
            if alert.acknowledged {
                stats.resolved += 1;
            } else {
                match alert.bucket() {
                    SeverityBucket::Critical => stats.critical += 1,
                    SeverityBucket::Warning => stats.warning += 1,
                    SeverityBucket::Info => stats.info += 1,
                }
            }
        }
        stats
    }

    /// Daily incidence buckets for the `days` days ending today (UTC).
    pub fn trend_buckets(&self, days: usize) -> Vec<TrendBucket> {
        self.trend_buckets_ending(days, Utc::now().date_naive())
    }

    /// Daily incidence buckets for the `days` days ending on `end`.
    ///
    /// The result is dense: exactly `days` consecutive entries oldest
    /// first, with zero counts for quiet days. Alerts outside the window
    /// are ignored; acknowledgment state is ignored entirely.
    pub fn trend_buckets_ending(&self, days: usize, end: NaiveDate) -> Vec<TrendBucket> {
        let Ok(span) = i64::try_from(days) else {
            return Vec::new();
        };
        let mut buckets: Vec<TrendBucket> = (0..span)
            .rev()
            .map(|back| TrendBucket::empty(end - Duration::days(back)))
            .collect();
        if buckets.is_empty() {
            return buckets;
        }
        let start = buckets[0].date;

        for alert in &*self.snapshot() {
            let date = alert.timestamp.date_naive();
            if date < start || date > end {
                continue;
            }
            let offset = (date - start).num_days();
            let Ok(offset) = usize::try_from(offset) else {
                continue;
            };
            let bucket = &mut buckets[offset];
            match alert.bucket() {
                SeverityBucket::Critical => bucket.critical += 1,
                SeverityBucket::Warning => bucket.warning += 1,
                SeverityBucket::Info => bucket.info += 1,
            }
        }
        buckets
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoardInner> {
        self.inner.lock().expect("alert board mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn alert(id: &str, severity: u8, day: u32) -> Alert {
        Alert {
            id: id.into(),
            device_id: "pump_a".into(),
            device_name: Some("Pump A".into()),
            alert_type: "ANOMALY".into(),
            severity,
            message: format!("anomaly on {id}"),
            timestamp: Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap(),
            acknowledged: false,
            resolution_notes: None,
            resolution_timestamp: None,
            sync: SyncState::Synced,
        }
    }

    fn acked(mut a: Alert) -> Alert {
        a.acknowledged = true;
        a.resolution_notes = Some("replaced bearing".into());
        a.resolution_timestamp = Some(a.timestamp);
        a
    }

    #[test]
    fn replace_is_idempotent_only_for_fresh_sequences() {
        let board = AlertBoard::new();
        assert!(board.replace_all(vec![alert("a1", 5, 20)], 1));
        assert_eq!(board.len(), 1);

        // Same data, fresh sequence: applied, same observable state.
        assert!(board.replace_all(vec![alert("a1", 5, 20)], 2));
        assert_eq!(board.len(), 1);
        assert_eq!(board.get("a1").unwrap().severity, 5);
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let board = AlertBoard::new();

        // Second fetch (seq 2) completes first with two alerts.
        assert!(board.replace_all(vec![alert("a1", 5, 20), alert("a2", 8, 21)], 2));
        // First fetch (seq 1) straggles in with only one.
        assert!(!board.replace_all(vec![alert("a1", 5, 20)], 1));

        assert_eq!(board.len(), 2);
        assert_eq!(board.last_seq(), 2);
    }

    #[test]
    fn acknowledge_happy_path_confirms_optimistic_state() {
        let board = AlertBoard::new();
        board.replace_all(vec![alert("a1", 7, 20)], 1);

        let pending = board.begin_acknowledge("a1", "replaced bearing").unwrap();
        assert!(pending.acknowledged);
        assert_eq!(pending.resolution_notes.as_deref(), Some("replaced bearing"));
        assert!(pending.resolution_timestamp.is_some());
        assert!(pending.sync.is_pending());

        let settled = board.complete_acknowledge("a1", AckOutcome::Confirmed(None)).unwrap();
        assert!(settled.acknowledged);
        assert_eq!(settled.sync, SyncState::Synced);
        assert_eq!(settled.resolution_notes.as_deref(), Some("replaced bearing"));
    }

    #[test]
    fn confirmed_with_record_adopts_backend_state() {
        let board = AlertBoard::new();
        board.replace_all(vec![alert("a1", 7, 20)], 1);
        board.begin_acknowledge("a1", "local notes").unwrap();

        let mut server = acked(alert("a1", 7, 20));
        server.resolution_notes = Some("canonical notes".into());
        let settled = board
            .complete_acknowledge("a1", AckOutcome::Confirmed(Some(server)))
            .unwrap();
        assert_eq!(settled.resolution_notes.as_deref(), Some("canonical notes"));
        assert_eq!(settled.sync, SyncState::Synced);
    }

    #[test]
    fn rollback_restores_prior_state_exactly() {
        let board = AlertBoard::new();
        board.replace_all(vec![alert("a1", 7, 20)], 1);
        let before = board.get("a1").unwrap();

        board.begin_acknowledge("a1", "oops").unwrap();
        assert!(board.get("a1").unwrap().acknowledged);

        let restored = board.complete_acknowledge("a1", AckOutcome::Failed).unwrap();
        assert_eq!(*restored, *before);
        assert!(!restored.acknowledged);
        assert!(restored.resolution_notes.is_none());
        assert!(restored.resolution_timestamp.is_none());
        assert_eq!(restored.sync, SyncState::Synced);
    }

    #[test]
    fn empty_notes_are_rejected_without_mutation() {
        let board = AlertBoard::new();
        board.replace_all(vec![alert("a1", 7, 20)], 1);
        let before = board.snapshot();

        let err = board.begin_acknowledge("a1", "   ").unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        let after = board.snapshot();
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert!(!board.get("a1").unwrap().acknowledged);
    }

    #[test]
    fn double_acknowledge_is_rejected() {
        let board = AlertBoard::new();
        board.replace_all(vec![alert("a1", 7, 20)], 1);
        board.begin_acknowledge("a1", "first").unwrap();

        // In flight.
        assert!(board.begin_acknowledge("a1", "second").is_err());

        board.complete_acknowledge("a1", AckOutcome::Confirmed(None));
        // Already resolved.
        assert!(board.begin_acknowledge("a1", "third").is_err());
    }

    #[test]
    fn unknown_alert_is_not_found() {
        let board = AlertBoard::new();
        let err = board.begin_acknowledge("ghost", "notes").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn snapshot_does_not_clobber_pending_acknowledge() {
        let board = AlertBoard::new();
        board.replace_all(vec![alert("a1", 7, 20)], 1);
        board.begin_acknowledge("a1", "in flight").unwrap();

        // Poll completes mid-flight with the alert still unacknowledged.
        assert!(board.replace_all(vec![alert("a1", 7, 20), alert("a2", 3, 21)], 2));

        let a1 = board.get("a1").unwrap();
        assert!(a1.acknowledged);
        assert!(a1.sync.is_pending());
        assert_eq!(board.len(), 2);

        // The tag still settles normally afterwards.
        let settled = board.complete_acknowledge("a1", AckOutcome::Confirmed(None)).unwrap();
        assert_eq!(settled.sync, SyncState::Synced);
    }

    #[test]
    fn completion_after_removal_is_a_noop() {
        let board = AlertBoard::new();
        board.replace_all(vec![alert("a1", 7, 20)], 1);
        board.begin_acknowledge("a1", "notes").unwrap();

        // Backend stopped reporting the alert entirely.
        board.replace_all(vec![alert("a2", 3, 21)], 2);
        assert!(board.complete_acknowledge("a1", AckOutcome::Failed).is_none());
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn statistics_partition_open_and_resolved() {
        let board = AlertBoard::new();
        board.replace_all(
            vec![
                alert("a1", 9, 20),
                alert("a2", 5, 20),
                alert("a3", 1, 21),
                acked(alert("a4", 10, 21)),
            ],
            1,
        );

        let stats = board.statistics();
        assert_eq!(stats.critical, 1);
        assert_eq!(stats.warning, 1);
        assert_eq!(stats.info, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.open_total(), 3);
    }

    #[test]
    fn trend_is_dense_and_ordered() {
        let board = AlertBoard::new();
        let end = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        board.replace_all(
            vec![
                alert("a1", 9, 26),
                alert("a2", 9, 26),
                alert("a3", 5, 24),
                acked(alert("a4", 2, 24)), // acknowledged still counts
                alert("a5", 8, 10),        // outside the window
            ],
            1,
        );

        let trend = board.trend_buckets_ending(7, end);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2026, 8, 20).unwrap());
        assert_eq!(trend[6].date, end);
        for pair in trend.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }

        assert_eq!(trend[6].critical, 2);
        assert_eq!(trend[4].warning, 1);
        assert_eq!(trend[4].info, 1);
        assert_eq!(trend[0].total(), 0);
    }

    #[test]
    fn trend_on_an_empty_board_is_still_dense() {
        let board = AlertBoard::new();
        let end = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();

        let trend = board.trend_buckets_ending(7, end);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2026, 8, 20).unwrap());
        assert_eq!(trend[6].date, end);
        for pair in trend.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
        assert!(trend.iter().all(|bucket| bucket.total() == 0));
    }

    #[test]
    fn watch_fires_on_every_applied_mutation() {
        let board = AlertBoard::new();
        let mut rx = board.subscribe();

        board.replace_all(vec![alert("a1", 7, 20)], 1);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        // Stale replace publishes nothing.
        board.replace_all(vec![], 1);
        assert!(!rx.has_changed().unwrap());

        board.begin_acknowledge("a1", "notes").unwrap();
        assert!(rx.has_changed().unwrap());
    }
}
