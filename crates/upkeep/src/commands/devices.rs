//! `upkeep devices` — device inventory table and detail views.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tabled::Tabled;

use upkeep_core::{Device, Monitor};

use crate::cli::{DevicesCommand, GlobalOpts};
use crate::config::build_monitor_config;
use crate::error::CliError;
use crate::output::{self, should_color, status_label};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "LOCATION")]
    location: String,
    #[tabled(rename = "TYPE")]
    device_type: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "LAST CHECK")]
    last_check: String,
}

pub async fn handle(command: &DevicesCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        DevicesCommand::List => list(global).await,
        DevicesCommand::Get { device } => get(device, global).await,
    }
}

async fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let config = build_monitor_config(global)?;
    let devices =
        Monitor::oneshot(config, |monitor| async move { Ok(monitor.devices_snapshot()) }).await?;

    let color = should_color(&global.color);
    let rendered = output::render_list(
        &global.output,
        &devices,
        |d| to_row(d, color),
        |d| d.id.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

async fn get(device_id: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let config = build_monitor_config(global)?;
    let id = device_id.to_owned();
    let device = Monitor::oneshot(config, |monitor| async move {
        Ok(monitor.store().devices.get(&id))
    })
    .await?
    .ok_or_else(|| CliError::NotFound {
        resource_type: "device".into(),
        identifier: device_id.into(),
        list_command: "devices list".into(),
    })?;

    let color = should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        &device,
        |d| format_detail(d, color),
        |d| d.id.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn to_row(device: &Arc<Device>, color: bool) -> DeviceRow {
    DeviceRow {
        id: device.id.clone(),
        name: device.name.clone(),
        location: device.location.clone(),
        device_type: device.device_type.clone(),
        status: status_label(device.status, color),
        last_check: format_timestamp(device.last_check.as_ref()),
    }
}

fn format_detail(device: &Arc<Device>, color: bool) -> String {
    let mut out = format!(
        "Device:     {} ({})\n\
         Location:   {}\n\
         Type:       {}\n\
         Status:     {}\n\
         Last check: {}",
        device.name,
        device.id,
        device.location,
        device.device_type,
        status_label(device.status, color),
        format_timestamp(device.last_check.as_ref()),
    );

    if !device.sensors.is_empty() {
        out.push_str("\nSensors:");
        for (metric, value) in &device.sensors {
            out.push_str(&format!("\n  {metric}: {value:.2}"));
        }
    }
    out
}

fn format_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".into(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
