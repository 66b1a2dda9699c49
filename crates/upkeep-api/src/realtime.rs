//! Realtime push channel with bounded auto-reconnect.
//!
//! Connects to the backend's WebSocket endpoint and routes typed
//! `{type, data}` messages to per-kind subscribers. A dropped connection is
//! retried with a fixed delay up to a bounded number of consecutive
//! failures; once the budget is spent the channel enters a terminal
//! [`Exhausted`](ChannelState::Exhausted) state that only an explicit
//! reconnect (constructing a fresh manager) can leave.
//!
//! # Example
//!
//! ```rust,ignore
//! use upkeep_api::{ChannelManager, ChannelSignal, MessageKind, ReconnectPolicy};
//! use url::Url;
//!
//! let url = Url::parse("ws://localhost:8000/ws/device-status")?;
//! let channel = ChannelManager::connect(url, ReconnectPolicy::default());
//! let mut sub = channel.subscribe(MessageKind::DeviceStatus);
//!
//! while let Some(signal) = sub.recv().await {
//!     match signal {
//!         ChannelSignal::Message(payload) => println!("{payload:?}"),
//!         ChannelSignal::Exhausted => break,
//!     }
//! }
//!
//! channel.disconnect();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::types::{MessageKind, RealtimeEnvelope, RealtimePayload};

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// Bounded fixed-delay reconnect configuration.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Consecutive connection failures tolerated before giving up.
    pub max_attempts: u32,

    /// Fixed delay between attempts. Must be non-zero to avoid
    /// hot-looping a dead endpoint.
    pub retry_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(5),
        }
    }
}

// ── Channel state ────────────────────────────────────────────────────

/// Observable connection state of the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// Not connected; carries the reason for the most recent drop, if any.
    Disconnected { reason: Option<String> },
    /// A connection attempt is in flight.
    Connecting,
    /// Connected and reading frames.
    Connected,
    /// Retry budget spent. Terminal until an explicit reconnect.
    Exhausted,
}

impl ChannelState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

// ── Subscriptions ────────────────────────────────────────────────────

/// A signal delivered to a subscriber.
#[derive(Debug, Clone)]
pub enum ChannelSignal {
    /// A decoded push message of the subscribed kind.
    Message(RealtimePayload),
    /// The reconnect budget is spent; no further messages will arrive.
    Exhausted,
}

/// Handle to a per-kind subscription.
///
/// Dropping the handle deregisters exactly this subscriber; other
/// subscribers for the same kind are unaffected.
pub struct Subscription {
    id: u64,
    kind: MessageKind,
    rx: mpsc::UnboundedReceiver<ChannelSignal>,
    registry: Arc<SubscriberRegistry>,
}

impl Subscription {
    /// Receive the next signal, or `None` once the channel is torn down.
    pub async fn recv(&mut self) -> Option<ChannelSignal> {
        self.rx.recv().await
    }

    /// The message kind this subscription is registered for.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.kind, self.id);
    }
}

/// Explicit kind-to-subscriber mapping.
///
/// Delivery is isolated per subscriber: a receiver that has gone away is
/// pruned, the rest still get the message.
struct SubscriberRegistry {
    next_id: AtomicU64,
    by_kind: DashMap<MessageKind, Vec<(u64, mpsc::UnboundedSender<ChannelSignal>)>>,
}

impl SubscriberRegistry {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            by_kind: DashMap::new(),
        }
    }

    fn add(&self, kind: MessageKind) -> (u64, mpsc::UnboundedReceiver<ChannelSignal>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.by_kind.entry(kind).or_default().push((id, tx));
        (id, rx)
    }

    fn remove(&self, kind: MessageKind, id: u64) {
        if let Some(mut entry) = self.by_kind.get_mut(&kind) {
            entry.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Deliver a payload to every subscriber registered for its kind.
    fn dispatch(&self, payload: &RealtimePayload) {
        if let Some(mut entry) = self.by_kind.get_mut(&payload.kind()) {
            entry.retain(|(_, tx)| tx.send(ChannelSignal::Message(payload.clone())).is_ok());
        }
    }

    /// Deliver a signal to every subscriber of every kind.
    fn notify_all(&self, signal: &ChannelSignal) {
        for mut entry in self.by_kind.iter_mut() {
            entry.retain(|(_, tx)| tx.send(signal.clone()).is_ok());
        }
    }

    fn clear(&self) {
        self.by_kind.clear();
    }
}

// ── ChannelManager ───────────────────────────────────────────────────

/// Owns a single live push connection and its reconnect loop.
///
/// Construct one instance at the application root and hand it to whichever
/// consumers need it; "at most one connection" falls out of single
/// ownership rather than a process-wide global.
pub struct ChannelManager {
    registry: Arc<SubscriberRegistry>,
    state: Arc<watch::Sender<ChannelState>>,
    cancel: CancellationToken,
}

impl ChannelManager {
    /// Spawn the connection loop against the given WebSocket URL.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Observe progress through [`state`](Self::state).
    pub fn connect(url: Url, policy: ReconnectPolicy) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let (state_tx, _) = watch::channel(ChannelState::Disconnected { reason: None });
        let state = Arc::new(state_tx);
        let cancel = CancellationToken::new();

        tokio::spawn(channel_loop(
            url,
            policy,
            Arc::clone(&registry),
            Arc::clone(&state),
            cancel.clone(),
        ));

        Self {
            registry,
            state,
            cancel,
        }
    }

    /// Subscribe to messages of one kind.
    ///
    /// Multiple subscribers per kind are allowed; each receives every
    /// message independently.
    pub fn subscribe(&self, kind: MessageKind) -> Subscription {
        let (id, rx) = self.registry.add(kind);
        Subscription {
            id,
            kind,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Watch connection state transitions.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// The current connection state.
    pub fn current_state(&self) -> ChannelState {
        self.state.borrow().clone()
    }

    /// Tear down the transport and clear all subscriptions.
    ///
    /// This is a full shutdown, not a pause: registered subscribers see
    /// their streams end and must re-subscribe on a fresh manager.
    pub fn disconnect(&self) {
        self.cancel.cancel();
        self.registry.clear();
        self.state.send_replace(ChannelState::Disconnected { reason: None });
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background connection loop ───────────────────────────────────────

/// Main loop: connect → read → on drop, count the failure, wait the fixed
/// delay, reconnect. A successful handshake resets the failure counter.
async fn channel_loop(
    url: Url,
    policy: ReconnectPolicy,
    registry: Arc<SubscriberRegistry>,
    state: Arc<watch::Sender<ChannelState>>,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        state.send_replace(ChannelState::Connecting);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = run_session(&url, &registry, &state, &cancel, &mut failures) => {
                let reason = match result {
                    Ok(()) => {
                        tracing::info!("realtime channel closed by server");
                        "connection closed".to_owned()
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, failures, "realtime channel error");
                        e.to_string()
                    }
                };

                state.send_replace(ChannelState::Disconnected {
                    reason: Some(reason),
                });

                failures += 1;
                if failures >= policy.max_attempts {
                    tracing::error!(
                        max_attempts = policy.max_attempts,
                        "realtime reconnect budget spent, giving up"
                    );
                    state.send_replace(ChannelState::Exhausted);
                    registry.notify_all(&ChannelSignal::Exhausted);
                    break;
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    () = tokio::time::sleep(policy.retry_delay) => {}
                }
            }
        }
    }

    tracing::debug!("realtime channel loop exiting");
}

/// Establish one WebSocket connection and read frames until it drops.
///
/// Marks the channel `Connected` and resets the failure counter once the
/// handshake succeeds.
async fn run_session(
    url: &Url,
    registry: &SubscriberRegistry,
    state: &watch::Sender<ChannelState>,
    cancel: &CancellationToken,
    failures: &mut u32,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting realtime channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::ChannelConnect(e.to_string()))?;

    tracing::info!("realtime channel connected");
    state.send_replace(ChannelState::Connected);
    *failures = 0;

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_dispatch(&text, registry);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite replies with pong automatically
                        tracing::trace!("realtime ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "close frame received");
                        } else {
                            tracing::info!("close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::ChannelConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("realtime stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse one text frame and route its payload to subscribers.
///
/// Malformed frames (unparseable JSON, missing or unknown `type`, payload
/// that does not match the kind's shape) are dropped with a log; they never
/// break the dispatch loop.
fn parse_and_dispatch(text: &str, registry: &SubscriberRegistry) {
    let envelope: RealtimeEnvelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "dropping unparseable realtime frame");
            return;
        }
    };

    let Ok(kind) = envelope.kind.parse::<MessageKind>() else {
        tracing::debug!(kind = %envelope.kind, "dropping realtime frame of unknown kind");
        return;
    };

    match RealtimePayload::decode(kind, envelope.data) {
        Ok(payload) => registry.dispatch(&payload),
        Err(e) => {
            tracing::warn!(%kind, error = %e, "dropping realtime frame with malformed payload");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn registry_with(kind: MessageKind) -> (Arc<SubscriberRegistry>, Subscription) {
        let registry = Arc::new(SubscriberRegistry::new());
        let (id, rx) = registry.add(kind);
        let sub = Subscription {
            id,
            kind,
            rx,
            registry: Arc::clone(&registry),
        };
        (registry, sub)
    }

    #[tokio::test]
    async fn dispatch_routes_by_kind() {
        let (registry, mut status_sub) = registry_with(MessageKind::DeviceStatus);
        let (pred_id, mut pred_rx) = registry.add(MessageKind::Predictions);

        let frame = serde_json::json!({
            "type": "device_status",
            "data": {
                "ups_001": {"id": "ups_001", "status": "warning"}
            }
        });
        parse_and_dispatch(&frame.to_string(), &registry);

        let signal = status_sub.recv().await.unwrap();
        match signal {
            ChannelSignal::Message(RealtimePayload::DeviceStatus(map)) => {
                assert_eq!(map["ups_001"].status, "warning");
            }
            other => panic!("unexpected signal: {other:?}"),
        }

        // The predictions subscriber saw nothing.
        assert!(pred_rx.try_recv().is_err());
        registry.remove(MessageKind::Predictions, pred_id);
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let (registry, mut sub) = registry_with(MessageKind::DeviceStatus);

        parse_and_dispatch("not json at all", &registry);
        parse_and_dispatch(r#"{"data": {}}"#, &registry);
        parse_and_dispatch(r#"{"type": "telemetry", "data": []}"#, &registry);
        // Right kind, wrong payload shape.
        parse_and_dispatch(r#"{"type": "device_status", "data": [1, 2, 3]}"#, &registry);

        assert!(sub.rx.try_recv().is_err());

        // A well-formed frame after the garbage still goes through.
        let frame = serde_json::json!({
            "type": "device_status",
            "data": {"hvac_001": {"id": "hvac_001", "status": "operational"}}
        });
        parse_and_dispatch(&frame.to_string(), &registry);
        assert!(matches!(
            sub.recv().await,
            Some(ChannelSignal::Message(RealtimePayload::DeviceStatus(_)))
        ));
    }

    #[tokio::test]
    async fn dropping_a_subscription_deregisters_only_that_subscriber() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (id_a, rx_a) = registry.add(MessageKind::Environmental);
        let (_id_b, mut rx_b) = registry.add(MessageKind::Environmental);

        let sub_a = Subscription {
            id: id_a,
            kind: MessageKind::Environmental,
            rx: rx_a,
            registry: Arc::clone(&registry),
        };
        drop(sub_a);

        let frame = serde_json::json!({
            "type": "environmental",
            "data": [{
                "id": "env_1",
                "type": "power",
                "start_time": "2026-08-20T10:00:00",
                "severity": "high",
                "description": "utility power sag"
            }]
        });
        parse_and_dispatch(&frame.to_string(), &registry);

        assert!(matches!(
            rx_b.try_recv(),
            Ok(ChannelSignal::Message(RealtimePayload::Environmental(_)))
        ));
    }

    #[tokio::test]
    async fn reconnect_budget_is_bounded() {
        // Nothing listens on this port: every attempt fails immediately.
        let url = Url::parse("ws://127.0.0.1:9/ws/device-status").unwrap();
        let channel = ChannelManager::connect(
            url,
            ReconnectPolicy {
                max_attempts: 5,
                retry_delay: Duration::from_millis(10),
            },
        );

        let mut sub = channel.subscribe(MessageKind::DeviceStatus);
        let mut state = channel.state();

        // The only signal a subscriber ever sees is the terminal one.
        assert!(matches!(sub.recv().await, Some(ChannelSignal::Exhausted)));

        state
            .wait_for(ChannelState::is_exhausted)
            .await
            .unwrap();
        assert!(channel.current_state().is_exhausted());

        // Terminal: the state does not move again on its own.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(channel.current_state().is_exhausted());
    }

    #[tokio::test]
    async fn disconnect_clears_subscriptions() {
        let url = Url::parse("ws://127.0.0.1:9/ws/device-status").unwrap();
        let channel = ChannelManager::connect(
            url,
            ReconnectPolicy {
                max_attempts: 100,
                retry_delay: Duration::from_millis(50),
            },
        );

        let mut sub = channel.subscribe(MessageKind::SensorHealth);
        channel.disconnect();

        // The subscriber's stream ends rather than hanging.
        assert!(sub.recv().await.is_none());
        assert_eq!(
            channel.current_state(),
            ChannelState::Disconnected { reason: None }
        );
    }
}
