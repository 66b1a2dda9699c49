//! `upkeep settings` — threshold and notification management.

use tabled::Tabled;

use upkeep_core::{Monitor, Settings, ThresholdBand};

use crate::cli::{GlobalOpts, SettingsCommand};
use crate::config::build_monitor_config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ThresholdRow {
    #[tabled(rename = "METRIC")]
    metric: String,
    #[tabled(rename = "WARNING")]
    warning: f64,
    #[tabled(rename = "CRITICAL")]
    critical: f64,
}

pub async fn handle(command: &SettingsCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        SettingsCommand::Show => show(global).await,
        SettingsCommand::SetThreshold {
            metric,
            warning,
            critical,
        } => set_threshold(metric, *warning, *critical, global).await,
        SettingsCommand::Notifications { email, sms } => {
            notifications(*email, *sms, global).await
        }
    }
}

async fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let config = build_monitor_config(global)?;
    let settings =
        Monitor::oneshot(config, |monitor| async move { monitor.fetch_settings().await }).await?;

    render(&settings, global);
    Ok(())
}

async fn set_threshold(
    metric: &str,
    warning: f64,
    critical: f64,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let band = ThresholdBand { warning, critical };
    // Reject inverted or non-finite bands before touching the network.
    band.validate(metric)?;

    let config = build_monitor_config(global)?;
    let metric = metric.to_owned();
    let settings = Monitor::oneshot(config, |monitor| async move {
        let mut settings = monitor.fetch_settings().await?;
        settings.thresholds.insert(metric, band);
        monitor.update_settings(&settings).await?;
        Ok(settings)
    })
    .await?;

    render(&settings, global);
    Ok(())
}

async fn notifications(
    email: Option<bool>,
    sms: Option<bool>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if email.is_none() && sms.is_none() {
        return Err(CliError::Validation {
            field: "notifications".into(),
            reason: "pass --email and/or --sms to change something".into(),
        });
    }

    let config = build_monitor_config(global)?;
    let settings = Monitor::oneshot(config, |monitor| async move {
        let mut settings = monitor.fetch_settings().await?;
        if let Some(email) = email {
            settings.notifications.email = email;
        }
        if let Some(sms) = sms {
            settings.notifications.sms = sms;
        }
        monitor.update_settings(&settings).await?;
        Ok(settings)
    })
    .await?;

    render(&settings, global);
    Ok(())
}

fn render(settings: &Settings, global: &GlobalOpts) {
    let rendered = output::render_single(
        &global.output,
        settings,
        format_detail,
        |s| format!("email={} sms={}", s.notifications.email, s.notifications.sms),
    );
    output::print_output(&rendered, global.quiet);
}

fn format_detail(settings: &Settings) -> String {
    let rows: Vec<ThresholdRow> = settings
        .thresholds
        .iter()
        .map(|(metric, band)| ThresholdRow {
            metric: metric.clone(),
            warning: band.warning,
            critical: band.critical,
        })
        .collect();

    let mut out = if rows.is_empty() {
        "No thresholds configured.".to_owned()
    } else {
        use tabled::{Table, settings::Style};
        Table::new(&rows).with(Style::rounded()).to_string()
    };

    out.push_str(&format!(
        "\nNotifications: email={}, sms={}",
        settings.notifications.email, settings.notifications.sms
    ));
    out
}
