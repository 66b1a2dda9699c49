// ── Runtime monitor configuration ──
//
// Describes *how* to reach the maintenance backend and how aggressively to
// poll it. Carries connection tuning only and never touches disk -- the
// CLI constructs a `MonitorConfig` from its profile layer and hands it in.

use std::time::Duration;

use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs on lab backends).
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single maintenance backend.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Backend root URL (e.g., `http://localhost:8000`).
    pub url: Url,
    /// Push-channel path relative to the root.
    pub ws_path: String,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Full snapshot poll interval. `ZERO` disables the poll task.
    pub poll_interval: Duration,
    /// Alert-only refresh interval, independent of the full poll.
    /// `ZERO` disables it.
    pub alert_refresh_interval: Duration,
    /// Enable the realtime push channel.
    pub realtime_enabled: bool,
    /// Consecutive realtime connection failures tolerated before the
    /// channel goes terminal.
    pub realtime_max_attempts: u32,
    /// Fixed delay between realtime reconnect attempts.
    pub realtime_retry_delay: Duration,
}

impl MonitorConfig {
    /// Config for the given backend with the standard dashboard cadence:
    /// 30-second polls on both timers, realtime on, bounded 5 x 5s retries.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            ws_path: "ws/device-status".into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
            alert_refresh_interval: Duration::from_secs(30),
            realtime_enabled: true,
            realtime_max_attempts: 5,
            realtime_retry_delay: Duration::from_secs(5),
        }
    }

    /// One-shot tuning: no background timers, no realtime channel.
    /// Suitable for a single request-response CLI invocation.
    pub fn oneshot(url: Url) -> Self {
        Self {
            poll_interval: Duration::ZERO,
            alert_refresh_interval: Duration::ZERO,
            realtime_enabled: false,
            ..Self::new(url)
        }
    }
}
