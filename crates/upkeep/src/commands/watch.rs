//! `upkeep watch` — stream realtime pushes until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast;

use upkeep_core::{ChannelState, MessageKind, Monitor, MonitorEvent};

use crate::cli::{GlobalOpts, KindArg, WatchArgs};
use crate::config::build_monitor_config;
use crate::error::CliError;
use crate::output::{self, should_color, status_label};

fn to_kind(arg: KindArg) -> MessageKind {
    match arg {
        KindArg::DeviceStatus => MessageKind::DeviceStatus,
        KindArg::Predictions => MessageKind::Predictions,
        KindArg::Environmental => MessageKind::Environmental,
        KindArg::SensorHealth => MessageKind::SensorHealth,
    }
}

pub async fn handle(args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = build_monitor_config(global)?;
    config.realtime_enabled = true;
    config.poll_interval = Duration::from_secs(args.poll_interval);
    config.alert_refresh_interval = Duration::ZERO;

    let kinds: Vec<MessageKind> = args.kind.iter().copied().map(to_kind).collect();
    let color = should_color(&global.color);

    let monitor = Monitor::new(config);
    monitor.connect().await?;
    let mut events = monitor.events();

    output::print_output("Watching for realtime pushes (Ctrl-C to stop)...", global.quiet);

    let mut exhausted = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = format_event(&event, &kinds, color) {
                        output::print_output(&line, global.quiet);
                    }
                    if matches!(*event, MonitorEvent::ChannelStateChanged(ChannelState::Exhausted)) {
                        exhausted = true;
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    monitor.disconnect().await;
    if exhausted {
        return Err(CliError::ChannelExhausted);
    }
    Ok(())
}

/// One printable line per event, or `None` when filtered out.
///
/// Channel state transitions always print; payload events honor the
/// `--kind` filter (empty filter means everything).
fn format_event(event: &Arc<MonitorEvent>, kinds: &[MessageKind], color: bool) -> Option<String> {
    let wanted = |kind: MessageKind| kinds.is_empty() || kinds.contains(&kind);
    let stamp = Local::now().format("%H:%M:%S");

    let body = match &**event {
        MonitorEvent::ChannelStateChanged(state) => format!("channel {}", describe_state(state)),

        MonitorEvent::RealtimePushed { kind, count } if wanted(*kind) => {
            format!("{kind}: {count} item(s)")
        }

        MonitorEvent::DeviceStatusChanged { device } if wanted(MessageKind::DeviceStatus) => {
            format!(
                "device {} ({}) -> {}",
                device.name,
                device.id,
                status_label(device.status, color)
            )
        }

        MonitorEvent::RefreshCompleted { devices, alerts } => {
            format!("refreshed: {devices} devices, {alerts} alerts")
        }
        MonitorEvent::RefreshFailed { reason } => format!("refresh failed: {reason}"),
        MonitorEvent::AcknowledgeRolledBack { alert_id, reason } => {
            format!("acknowledge of {alert_id} rolled back: {reason}")
        }

        _ => return None,
    };

    Some(format!("[{stamp}] {body}"))
}

fn describe_state(state: &ChannelState) -> String {
    match state {
        ChannelState::Disconnected { reason } => match reason {
            Some(reason) => format!("disconnected ({reason})"),
            None => "disconnected".into(),
        },
        ChannelState::Connecting => "connecting".into(),
        ChannelState::Connected => "connected".into(),
        ChannelState::Exhausted => "exhausted (reconnect budget spent)".into(),
    }
}
