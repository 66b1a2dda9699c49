//! `upkeep status` — backend health and store summary.

use serde::Serialize;

use upkeep_core::Monitor;

use crate::cli::GlobalOpts;
use crate::config::build_monitor_config;
use crate::error::CliError;
use crate::output::{self, should_color};

#[derive(Debug, Serialize)]
struct StatusReport {
    server: String,
    connected: bool,
    devices: usize,
    degraded_devices: usize,
    open_alerts: usize,
    critical: usize,
    warning: usize,
    info: usize,
    resolved: usize,
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = build_monitor_config(global)?;
    let server = config.url.to_string();

    let (devices, stats) = Monitor::oneshot(config, |monitor| async move {
        let devices = monitor.devices_snapshot();
        let stats = monitor.store().alerts.statistics();
        Ok((devices, stats))
    })
    .await?;

    let report = StatusReport {
        server,
        connected: true,
        devices: devices.len(),
        degraded_devices: devices.iter().filter(|d| d.status.is_degraded()).count(),
        open_alerts: stats.open_total(),
        critical: stats.critical,
        warning: stats.warning,
        info: stats.info,
        resolved: stats.resolved,
    };

    let color = should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        &report,
        |r| format_report(r, color),
        |r| if r.connected { "connected".into() } else { "disconnected".into() },
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn format_report(r: &StatusReport, color: bool) -> String {
    use owo_colors::OwoColorize;

    let state = if color {
        "connected".green().to_string()
    } else {
        "connected".to_string()
    };

    format!(
        "Server:   {}\n\
         State:    {state}\n\
         Devices:  {} ({} degraded)\n\
         Alerts:   {} open ({} critical, {} warning, {} info), {} resolved",
        r.server, r.devices, r.degraded_devices, r.open_alerts, r.critical, r.warning, r.info,
        r.resolved
    )
}
