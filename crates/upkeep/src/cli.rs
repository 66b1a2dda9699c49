//! Clap derive structures for the `upkeep` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! This module must depend only on clap + clap_complete: build.rs pulls
//! it in directly to generate man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// upkeep -- predictive-maintenance dashboard for the terminal
#[derive(Debug, Parser)]
#[command(
    name = "upkeep",
    version,
    about = "Monitor device health and maintenance alerts from the command line",
    long_about = "A CLI for the upkeep predictive-maintenance backend.\n\n\
        Polls device inventory and alerts over REST, streams status pushes\n\
        over the realtime channel, and resolves alerts with optimistic\n\
        acknowledgement.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "UPKEEP_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 's', env = "UPKEEP_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "UPKEEP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "UPKEEP_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "UPKEEP_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Backend health and connection summary
    Status,

    /// Inspect monitored devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// List, filter, and acknowledge alerts
    #[command(alias = "al", alias = "a")]
    Alerts(AlertsArgs),

    /// Stream realtime pushes until interrupted
    Watch(WatchArgs),

    /// View and edit threshold and notification settings
    Settings(SettingsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List all monitored devices
    #[command(alias = "ls")]
    List,

    /// Show one device in detail
    Get {
        /// Device id
        device: String,
    },
}

// ── Alerts ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List alerts through the filtered view
    #[command(alias = "ls")]
    List(AlertListArgs),

    /// Acknowledge an alert with resolution notes
    Ack {
        /// Alert id
        alert: String,

        /// Resolution notes (mandatory, must be non-empty)
        #[arg(long, short = 'n')]
        notes: String,
    },

    /// Severity-bucketed alert counts
    Stats,

    /// Daily alert incidence for the last N days
    Trend {
        /// Window size in days
        #[arg(long, default_value = "7")]
        days: usize,
    },
}

#[derive(Debug, Args)]
pub struct AlertListArgs {
    /// Resolution slice to show
    #[arg(long, value_enum, default_value = "active")]
    pub tab: TabArg,

    /// Severity bucket filter
    #[arg(long, value_enum, default_value = "all")]
    pub severity: SeverityArg,

    /// Restrict to one device id
    #[arg(long)]
    pub device: Option<String>,

    /// Case-insensitive substring over message, device name, and bucket
    #[arg(long)]
    pub search: Option<String>,

    /// Sort key
    #[arg(long, value_enum, default_value = "severity")]
    pub sort: SortArg,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,

    /// Zero-indexed page
    #[arg(long, default_value = "0")]
    pub page: usize,

    /// Rows per page (0 disables pagination)
    #[arg(long, default_value = "25")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TabArg {
    All,
    Active,
    Resolved,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SeverityArg {
    All,
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Severity,
    Timestamp,
    Device,
    Bucket,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Message kinds to print (default: all)
    #[arg(long, value_enum)]
    pub kind: Vec<KindArg>,

    /// Full snapshot poll interval in seconds (0 disables)
    #[arg(long, default_value = "30")]
    pub poll_interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    DeviceStatus,
    Predictions,
    Environmental,
    SensorHealth,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show current thresholds and notification preferences
    Show,

    /// Set the warning/critical band for one metric
    SetThreshold {
        /// Metric name (e.g. temperature)
        metric: String,

        /// Warning threshold
        #[arg(long)]
        warning: f64,

        /// Critical threshold (must be above warning)
        #[arg(long)]
        critical: f64,
    },

    /// Toggle notification channels
    Notifications {
        /// Enable or disable email notifications
        #[arg(long)]
        email: Option<bool>,

        /// Enable or disable SMS notifications
        #[arg(long)]
        sms: Option<bool>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactively create or update a profile
    Init,

    /// Print the resolved configuration
    Show,

    /// Set the default profile
    SetDefault {
        /// Profile name
        name: String,
    },

    /// List configured profiles
    ListProfiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
