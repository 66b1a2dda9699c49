// ── Monitor abstraction ──
//
// Full lifecycle management for a maintenance-backend connection.
// Handles the health handshake, periodic polling, optimistic alert
// acknowledgement, command routing, and the realtime push channel, all
// reconciled through the DashboardStore.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use upkeep_api::types::{AcknowledgeRequest, AlertListFilter};
use upkeep_api::{
    ApiClient, ChannelManager, ChannelSignal, ChannelState, MessageKind, RealtimePayload,
    ReconnectPolicy, Subscription, TlsMode, TransportConfig,
};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::{MonitorConfig, TlsVerification};
use crate::convert::{self, alert_from_record};
use crate::error::CoreError;
use crate::model::{Alert, Device, DeviceStatus, Settings};
use crate::store::{AckOutcome, DashboardStore};

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

// ── MonitorState ─────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── MonitorEvent ─────────────────────────────────────────────────

/// Broadcast notifications about state the monitor changed on its own:
/// timer-driven refreshes, rollbacks, realtime transitions. Direct call
/// results are returned to the caller, not broadcast.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    RefreshCompleted { devices: usize, alerts: usize },
    RefreshFailed { reason: String },
    AlertAcknowledged { alert: Arc<Alert> },
    /// The backend rejected an acknowledge; the alert was restored to its
    /// pre-mutation state.
    AcknowledgeRolledBack { alert_id: String, reason: String },
    SettingsUpdated,
    DeviceStatusChanged { device: Arc<Device> },
    ChannelStateChanged(ChannelState),
    /// A realtime push arrived, carrying `count` payload items.
    RealtimePushed { kind: MessageKind, count: usize },
}

// ── Monitor ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Manages the full
/// connection lifecycle: health handshake, background polling, command
/// routing, and the realtime channel.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    store: Arc<DashboardStore>,
    state: watch::Sender<MonitorState>,
    event_tx: broadcast::Sender<Arc<MonitorEvent>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    client: Mutex<Option<Arc<ApiClient>>>,
    channel: Mutex<Option<ChannelManager>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    /// Create a new Monitor from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to probe the backend and start
    /// background tasks.
    pub fn new(config: MonitorConfig) -> Self {
        let store = Arc::new(DashboardStore::new());
        let (state, _) = watch::channel(MonitorState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        Self {
            inner: Arc::new(MonitorInner {
                config,
                store,
                state,
                event_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                client: Mutex::new(None),
                channel: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Access the underlying DashboardStore.
    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the backend.
    ///
    /// Probes `/health`, performs an initial snapshot load, and spawns
    /// background tasks (pollers, command processor, realtime channel).
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _ = self.inner.state.send(MonitorState::Connecting);

        let config = &self.inner.config;
        let transport = build_transport(config);
        let client = match ApiClient::new(config.url.clone(), &transport) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                let _ = self.inner.state.send(MonitorState::Failed);
                return Err(e.into());
            }
        };

        match client.health().await {
            Ok(health) if health.is_healthy() => {
                debug!(
                    devices = ?health.device_count,
                    alerts = ?health.alert_count,
                    "backend healthy"
                );
            }
            Ok(health) => {
                warn!(status = %health.status, "backend reports unhealthy, continuing");
            }
            Err(e) => {
                let _ = self.inner.state.send(MonitorState::Failed);
                return Err(CoreError::ConnectionFailed {
                    url: config.url.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        *self.inner.client.lock().await = Some(Arc::clone(&client));

        // Initial snapshot load
        self.full_refresh().await?;

        // Spawn background tasks
        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let monitor = self.clone();
            handles.push(tokio::spawn(command_processor_task(monitor, rx)));
        }

        if !config.poll_interval.is_zero() {
            let monitor = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(poll_task(monitor, config.poll_interval, cancel)));
        }

        if !config.alert_refresh_interval.is_zero() {
            let monitor = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(alert_poll_task(
                monitor,
                config.alert_refresh_interval,
                cancel,
            )));
        }

        if config.realtime_enabled {
            let handle = self.start_realtime(&client).await?;
            handles.push(handle);
        }

        drop(handles);
        let _ = self.inner.state.send(MonitorState::Connected);
        info!(url = %config.url, "connected to backend");
        Ok(())
    }

    /// Disconnect from the backend.
    ///
    /// Cancels background tasks, tears down the realtime channel, and
    /// resets the state to [`Disconnected`](MonitorState::Disconnected).
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        if let Some(channel) = self.inner.channel.lock().await.take() {
            channel.disconnect();
        }

        // Join all background tasks. Take the handles out and release the
        // lock first: a task being joined here (the command processor) may
        // itself be awaiting `task_handles` to register a fresh realtime
        // handle, and holding the guard across `await` would deadlock.
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.inner.task_handles.lock().await;
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }

        *self.inner.client.lock().await = None;
        let _ = self.inner.state.send(MonitorState::Disconnected);
        debug!("disconnected");
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Fetch devices and alerts and replace both mirrors.
    ///
    /// The fetch sequence number is stamped before the requests go out;
    /// the store discards the result if a later-issued fetch has already
    /// landed. On failure the previous mirrors stay intact.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        let store = &self.inner.store;
        let seq = store.next_fetch_seq();

        let filter = AlertListFilter::default();
        let (devices_res, alerts_res) = tokio::join!(
            client.list_devices(),
            client.list_alerts(&filter),
        );

        let devices: Vec<Device> = devices_res?.into_iter().map(Device::from).collect();
        store.devices.replace_all(devices, seq);

        let alerts: Vec<Alert> = alerts_res?
            .into_iter()
            .filter_map(|record| {
                let device_name = store.devices.display_name(&record.device_id);
                alert_from_record(record, device_name)
            })
            .collect();
        store.alerts.replace_all(alerts, seq);

        let devices = store.devices.len();
        let alerts = store.alerts.len();
        debug!(devices, alerts, "snapshot refresh complete");
        self.emit(MonitorEvent::RefreshCompleted { devices, alerts });
        Ok(())
    }

    /// Re-fetch alerts only, leaving the device mirror untouched.
    pub async fn refresh_alerts(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        let store = &self.inner.store;
        let seq = store.next_fetch_seq();

        let records = client.list_alerts(&AlertListFilter::default()).await?;
        let alerts: Vec<Alert> = records
            .into_iter()
            .filter_map(|record| {
                let device_name = store.devices.display_name(&record.device_id);
                alert_from_record(record, device_name)
            })
            .collect();
        store.alerts.replace_all(alerts, seq);
        debug!(alerts = store.alerts.len(), "alert refresh complete");
        Ok(())
    }

    // ── Alert acknowledgement ────────────────────────────────────

    /// Acknowledge an alert with mandatory resolution notes.
    ///
    /// The mutation is applied optimistically before the request goes
    /// out. A backend rejection (or transport failure) rolls the alert
    /// back to its exact pre-mutation state and surfaces
    /// [`CoreError::AcknowledgeFailed`]. Validation failures (empty
    /// notes, unknown alert, already resolved) are caught locally and
    /// never reach the network.
    pub async fn acknowledge_alert(
        &self,
        alert_id: &str,
        notes: &str,
    ) -> Result<Arc<Alert>, CoreError> {
        let client = self.client().await?;
        let pending = self.inner.store.alerts.begin_acknowledge(alert_id, notes)?;

        let request = AcknowledgeRequest {
            acknowledged: true,
            notes: pending.resolution_notes.clone().unwrap_or_default(),
            resolution_timestamp: pending
                .resolution_timestamp
                .map(|ts| ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
                .unwrap_or_default(),
        };

        match client.acknowledge_alert(alert_id, &request).await {
            Ok(server_record) => {
                // Adopt the backend's record when it returned one; a bare
                // confirmation keeps the optimistic state.
                let adopted = server_record.and_then(|record| {
                    let device_name = self.inner.store.devices.display_name(&record.device_id);
                    alert_from_record(record, device_name)
                });
                let settled = self
                    .inner
                    .store
                    .alerts
                    .complete_acknowledge(alert_id, AckOutcome::Confirmed(adopted))
                    .unwrap_or(pending);
                self.emit(MonitorEvent::AlertAcknowledged {
                    alert: Arc::clone(&settled),
                });
                Ok(settled)
            }
            Err(e) => {
                let reason = CoreError::from(e).to_string();
                self.inner
                    .store
                    .alerts
                    .complete_acknowledge(alert_id, AckOutcome::Failed);
                warn!(alert_id, %reason, "acknowledge rejected, rolled back");
                self.emit(MonitorEvent::AcknowledgeRolledBack {
                    alert_id: alert_id.to_owned(),
                    reason: reason.clone(),
                });
                Err(CoreError::AcknowledgeFailed {
                    alert_id: alert_id.to_owned(),
                    reason,
                })
            }
        }
    }

    // ── Settings ─────────────────────────────────────────────────

    /// Fetch the current threshold and notification settings.
    pub async fn fetch_settings(&self) -> Result<Settings, CoreError> {
        let client = self.client().await?;
        Ok(Settings::from(client.get_settings().await?))
    }

    /// Validate and replace the backend settings.
    pub async fn update_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        settings.validate()?;
        let client = self.client().await?;
        client.update_settings(&settings.into()).await?;
        self.emit(MonitorEvent::SettingsUpdated);
        Ok(())
    }

    // ── Realtime channel ─────────────────────────────────────────

    /// The realtime channel's current state, if the channel exists.
    pub async fn channel_state(&self) -> Option<ChannelState> {
        self.inner
            .channel
            .lock()
            .await
            .as_ref()
            .map(ChannelManager::current_state)
    }

    /// Tear down the current realtime channel and start a fresh one with
    /// a full reconnect budget. The only way out of a terminal
    /// [`Exhausted`](ChannelState::Exhausted) channel.
    pub async fn reconnect_realtime(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        if let Some(old) = self.inner.channel.lock().await.take() {
            old.disconnect();
        }
        let handle = self.start_realtime(&client).await?;
        self.inner.task_handles.lock().await.push(handle);
        Ok(())
    }

    /// Build a fresh channel manager, wire up subscriptions, and spawn
    /// the consuming task.
    async fn start_realtime(&self, client: &ApiClient) -> Result<JoinHandle<()>, CoreError> {
        let config = &self.inner.config;
        let url = client.realtime_url(&config.ws_path)?;
        let policy = ReconnectPolicy {
            max_attempts: config.realtime_max_attempts,
            retry_delay: config.realtime_retry_delay,
        };

        let channel = ChannelManager::connect(url, policy);
        let subs = RealtimeSubscriptions {
            device_status: channel.subscribe(MessageKind::DeviceStatus),
            predictions: channel.subscribe(MessageKind::Predictions),
            environmental: channel.subscribe(MessageKind::Environmental),
            sensor_health: channel.subscribe(MessageKind::SensorHealth),
        };
        let state_rx = channel.state();
        *self.inner.channel.lock().await = Some(channel);

        let monitor = self.clone();
        let cancel = self.inner.cancel.clone();
        Ok(tokio::spawn(realtime_task(monitor, subs, state_rx, cancel)))
    }

    /// Apply a `device_status` push to the device mirror.
    ///
    /// Unknown devices are skipped (the next poll carries their full
    /// record). A device pushed into a degraded status triggers an
    /// immediate alert refresh, since the backend usually raises alerts
    /// in the same evaluation pass.
    async fn apply_status_push(
        &self,
        updates: std::collections::BTreeMap<String, upkeep_api::types::DeviceStatusUpdate>,
    ) {
        let mut degraded = false;
        for (device_id, update) in updates {
            let status = DeviceStatus::from_wire(&update.status);
            let patched = self.inner.store.devices.patch(&device_id, |device| {
                device.status = status;
                if let Some(ts) = update.last_updated.as_deref().and_then(convert::parse_timestamp)
                {
                    device.last_check = Some(ts);
                }
            });
            match patched {
                Some(device) => {
                    degraded |= status.is_degraded();
                    self.emit(MonitorEvent::DeviceStatusChanged { device });
                }
                None => debug!(%device_id, "status push for unknown device, skipping"),
            }
        }

        if degraded {
            if let Err(e) = self.refresh_alerts().await {
                warn!(error = %e, "alert refresh after status push failed");
            }
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the backend.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.state.borrow() != MonitorState::Connected {
            return Err(CoreError::Disconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Disconnected)?;

        rx.await.map_err(|_| CoreError::Disconnected)?
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Optimized for CLI: disables the realtime channel and both poll
    /// timers since we only need a single request-response cycle.
    pub async fn oneshot<F, Fut, T>(config: MonitorConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Monitor) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.realtime_enabled = false;
        cfg.poll_interval = Duration::ZERO;
        cfg.alert_refresh_interval = Duration::ZERO;

        let monitor = Monitor::new(cfg);
        monitor.connect().await?;
        let result = f(monitor.clone()).await;
        monitor.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<MonitorState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to the event broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<Arc<MonitorEvent>> {
        self.inner.event_tx.subscribe()
    }

    // ── Snapshot and stream accessors (delegate to the store) ────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.inner.store.devices.snapshot()
    }

    pub fn alerts_snapshot(&self) -> Arc<Vec<Arc<Alert>>> {
        self.inner.store.alerts.snapshot()
    }

    pub fn devices(&self) -> crate::stream::EntityStream<Device> {
        self.inner.store.subscribe_devices()
    }

    pub fn alerts(&self) -> crate::stream::EntityStream<Alert> {
        self.inner.store.subscribe_alerts()
    }

    // ── Helpers ──────────────────────────────────────────────────

    async fn client(&self) -> Result<Arc<ApiClient>, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(CoreError::Disconnected)
    }

    fn emit(&self, event: MonitorEvent) {
        let _ = self.inner.event_tx.send(Arc::new(event));
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically refresh devices and alerts.
async fn poll_task(monitor: Monitor, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = monitor.full_refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                    monitor.emit(MonitorEvent::RefreshFailed { reason: e.to_string() });
                }
            }
        }
    }
}

/// Periodically refresh alerts between full polls.
async fn alert_poll_task(monitor: Monitor, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = monitor.refresh_alerts().await {
                    warn!(error = %e, "periodic alert refresh failed");
                    monitor.emit(MonitorEvent::RefreshFailed { reason: e.to_string() });
                }
            }
        }
    }
}

/// Process commands from the mpsc channel, routing each to the
/// appropriate backend operation.
async fn command_processor_task(monitor: Monitor, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = monitor.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&monitor, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

struct RealtimeSubscriptions {
    device_status: Subscription,
    predictions: Subscription,
    environmental: Subscription,
    sensor_health: Subscription,
}

/// Consume one channel manager's subscriptions and state transitions.
///
/// `device_status` pushes patch the device mirror directly. Prediction
/// and environmental pushes are advisory: the backend persists the
/// corresponding alert records, so the task answers with an alert
/// refresh instead of synthesizing local alerts. Sensor-health pushes
/// are logged for operator visibility.
async fn realtime_task(
    monitor: Monitor,
    mut subs: RealtimeSubscriptions,
    mut state_rx: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break; // manager dropped
                }
                let state = state_rx.borrow_and_update().clone();
                debug!(?state, "realtime channel state changed");
                monitor.emit(MonitorEvent::ChannelStateChanged(state));
            }
            signal = subs.device_status.recv() => {
                let Some(signal) = signal else { break };
                if let ChannelSignal::Message(RealtimePayload::DeviceStatus(updates)) = signal {
                    monitor.emit(MonitorEvent::RealtimePushed {
                        kind: MessageKind::DeviceStatus,
                        count: updates.len(),
                    });
                    monitor.apply_status_push(updates).await;
                }
            }
            signal = subs.predictions.recv() => {
                let Some(signal) = signal else { break };
                if let ChannelSignal::Message(RealtimePayload::Predictions(entries)) = signal {
                    debug!(count = entries.len(), "predicted failures pushed");
                    monitor.emit(MonitorEvent::RealtimePushed {
                        kind: MessageKind::Predictions,
                        count: entries.len(),
                    });
                    if let Err(e) = monitor.refresh_alerts().await {
                        warn!(error = %e, "alert refresh after predictions push failed");
                    }
                }
            }
            signal = subs.environmental.recv() => {
                let Some(signal) = signal else { break };
                if let ChannelSignal::Message(RealtimePayload::Environmental(entries)) = signal {
                    debug!(count = entries.len(), "environmental alerts pushed");
                    monitor.emit(MonitorEvent::RealtimePushed {
                        kind: MessageKind::Environmental,
                        count: entries.len(),
                    });
                    if let Err(e) = monitor.refresh_alerts().await {
                        warn!(error = %e, "alert refresh after environmental push failed");
                    }
                }
            }
            signal = subs.sensor_health.recv() => {
                let Some(signal) = signal else { break };
                if let ChannelSignal::Message(RealtimePayload::SensorHealth(reports)) = signal {
                    monitor.emit(MonitorEvent::RealtimePushed {
                        kind: MessageKind::SensorHealth,
                        count: reports.len(),
                    });
                    for report in reports {
                        if !report.data_gaps.is_empty() {
                            warn!(
                                device_id = %report.device_id,
                                sensor = %report.sensor_type,
                                gaps = report.data_gaps.len(),
                                "sensor reporting data gaps"
                            );
                        }
                    }
                }
            }
        }
    }

    debug!("realtime task exiting");
}

// ── Command routing ──────────────────────────────────────────────

/// Route a command to the matching monitor operation.
async fn route_command(monitor: &Monitor, cmd: Command) -> Result<CommandResult, CoreError> {
    match cmd {
        Command::AcknowledgeAlert { alert_id, notes } => {
            let alert = monitor.acknowledge_alert(&alert_id, &notes).await?;
            Ok(CommandResult::Alert(alert))
        }
        Command::UpdateSettings { settings } => {
            monitor.update_settings(&settings).await?;
            Ok(CommandResult::Ok)
        }
        Command::FetchSettings => {
            let settings = monitor.fetch_settings().await?;
            Ok(CommandResult::Settings(settings))
        }
        Command::Refresh => {
            monitor.full_refresh().await?;
            Ok(CommandResult::Ok)
        }
        Command::RefreshAlerts => {
            monitor.refresh_alerts().await?;
            Ok(CommandResult::Ok)
        }
        Command::ReconnectRealtime => {
            monitor.reconnect_realtime().await?;
            Ok(CommandResult::Ok)
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Build a [`TransportConfig`] from the monitor configuration.
fn build_transport(config: &MonitorConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
