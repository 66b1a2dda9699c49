//! `upkeep alerts` — filtered list, acknowledge, stats, trend.

use std::io::IsTerminal;
use std::sync::Arc;

use dialoguer::Confirm;
use tabled::Tabled;

use upkeep_core::{
    Alert, AlertQuery, Monitor, SeverityBucket, SeverityFilter, SortDir, SortKey, Tab, TrendBucket,
};

use crate::cli::{AlertListArgs, AlertsCommand, GlobalOpts, SeverityArg, SortArg, TabArg};
use crate::config::build_monitor_config;
use crate::error::CliError;
use crate::output::{self, bucket_label, should_color};

const MESSAGE_WIDTH: usize = 60;

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "SEVERITY")]
    severity: String,
    #[tabled(rename = "DEVICE")]
    device: String,
    #[tabled(rename = "MESSAGE")]
    message: String,
    #[tabled(rename = "TIME")]
    timestamp: String,
    #[tabled(rename = "ACK")]
    acknowledged: String,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "CRITICAL")]
    critical: usize,
    #[tabled(rename = "WARNING")]
    warning: usize,
    #[tabled(rename = "INFO")]
    info: usize,
    #[tabled(rename = "TOTAL")]
    total: usize,
}

pub async fn handle(command: AlertsCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        AlertsCommand::List(args) => list(&args, global).await,
        AlertsCommand::Ack { alert, notes } => ack(&alert, &notes, global).await,
        AlertsCommand::Stats => stats(global).await,
        AlertsCommand::Trend { days } => trend(days, global).await,
    }
}

// ── List ─────────────────────────────────────────────────────────────

fn build_query(args: &AlertListArgs) -> AlertQuery {
    AlertQuery {
        tab: match args.tab {
            TabArg::All => Tab::All,
            TabArg::Active => Tab::Active,
            TabArg::Resolved => Tab::Resolved,
        },
        severity: match args.severity {
            SeverityArg::All => SeverityFilter::All,
            SeverityArg::Info => SeverityFilter::Bucket(SeverityBucket::Info),
            SeverityArg::Warning => SeverityFilter::Bucket(SeverityBucket::Warning),
            SeverityArg::Critical => SeverityFilter::Bucket(SeverityBucket::Critical),
        },
        device: args.device.clone(),
        search: args.search.clone(),
        sort: match args.sort {
            SortArg::Severity => SortKey::Severity,
            SortArg::Timestamp => SortKey::Timestamp,
            SortArg::Device => SortKey::Device,
            SortArg::Bucket => SortKey::Bucket,
        },
        direction: if args.asc { SortDir::Asc } else { SortDir::Desc },
        page: args.page,
        page_size: args.page_size,
    }
}

async fn list(args: &AlertListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = build_monitor_config(global)?;
    let query = build_query(args);
    let page = Monitor::oneshot(config, |monitor| async move {
        Ok(monitor.store().alerts.filtered_view(&query))
    })
    .await?;

    let color = should_color(&global.color);
    let rendered = output::render_list(
        &global.output,
        &page.alerts,
        |a| to_row(a, color),
        |a| a.id.clone(),
    );
    output::print_output(&rendered, global.quiet);

    if matches!(global.output, crate::cli::OutputFormat::Table) {
        output::print_output(
            &format!(
                "page {} of {} ({} matched)",
                page.page + 1,
                page.page_count,
                page.total_matched
            ),
            global.quiet,
        );
    }
    Ok(())
}

fn to_row(alert: &Arc<Alert>, color: bool) -> AlertRow {
    AlertRow {
        id: alert.id.clone(),
        severity: format!("{} ({})", bucket_label(alert.bucket(), color), alert.severity),
        device: alert.display_device().to_owned(),
        message: truncate(&alert.message, MESSAGE_WIDTH),
        timestamp: alert.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        acknowledged: if alert.acknowledged { "yes" } else { "" }.into(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}\u{2026}")
}

// ── Acknowledge ──────────────────────────────────────────────────────

async fn ack(alert_id: &str, notes: &str, global: &GlobalOpts) -> Result<(), CliError> {
    if notes.trim().is_empty() {
        return Err(CliError::Validation {
            field: "notes".into(),
            reason: "resolution notes must not be empty".into(),
        });
    }

    if !global.yes && std::io::stdin().is_terminal() {
        let proceed = Confirm::new()
            .with_prompt(format!("Acknowledge alert {alert_id}?"))
            .default(false)
            .interact()
            .map_err(|e| CliError::Backend(format!("prompt failed: {e}")))?;
        if !proceed {
            output::print_output("Aborted.", global.quiet);
            return Ok(());
        }
    }

    let config = build_monitor_config(global)?;
    let id = alert_id.to_owned();
    let notes = notes.to_owned();
    let alert = Monitor::oneshot(config, |monitor| async move {
        monitor.acknowledge_alert(&id, &notes).await
    })
    .await?;

    let color = should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        &alert,
        |a| {
            format!(
                "Acknowledged {} ({}, {})",
                a.id,
                bucket_label(a.bucket(), color),
                a.display_device()
            )
        },
        |a| a.id.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

// ── Stats ────────────────────────────────────────────────────────────

async fn stats(global: &GlobalOpts) -> Result<(), CliError> {
    let config = build_monitor_config(global)?;
    let stats = Monitor::oneshot(config, |monitor| async move {
        Ok(monitor.store().alerts.statistics())
    })
    .await?;

    let color = should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        &stats,
        |s| {
            format!(
                "{}: {}\n{}: {}\n{}: {}\nopen total: {}\nresolved: {}",
                bucket_label(SeverityBucket::Critical, color),
                s.critical,
                bucket_label(SeverityBucket::Warning, color),
                s.warning,
                bucket_label(SeverityBucket::Info, color),
                s.info,
                s.open_total(),
                s.resolved
            )
        },
        |s| s.open_total().to_string(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

// ── Trend ────────────────────────────────────────────────────────────

async fn trend(days: usize, global: &GlobalOpts) -> Result<(), CliError> {
    let config = build_monitor_config(global)?;
    let buckets = Monitor::oneshot(config, |monitor| async move {
        Ok(monitor.store().alerts.trend_buckets(days))
    })
    .await?;

    let rendered = output::render_list(
        &global.output,
        &buckets,
        trend_row,
        |b| format!("{}\t{}", b.date, b.total()),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn trend_row(bucket: &TrendBucket) -> TrendRow {
    TrendRow {
        date: bucket.date.to_string(),
        critical: bucket.critical,
        warning: bucket.warning,
        info: bucket.info,
        total: bucket.total(),
    }
}
