//! CLI-side configuration resolution.
//!
//! Layers `GlobalOpts` flag overrides on top of the shared profile layer
//! in `upkeep-config`, producing the `MonitorConfig` commands connect with.

use std::time::Duration;

use upkeep_config::{Config, Profile, config_path, load_config_or_default};
use upkeep_core::{MonitorConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The profile name to use: `--profile` beats the file's default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `MonitorConfig` from the config file, profile, and CLI overrides.
///
/// `--server` alone is enough to run without any config file.
pub fn build_monitor_config(global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, global);
    }

    // An explicitly named profile must exist.
    if global.profile.is_some() {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    }

    // No profile -- build from CLI flags / env vars alone.
    let url_str = global.server.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let mut profile = Profile::new(url_str);
    profile.insecure = Some(global.insecure);
    profile.timeout = Some(global.timeout);
    resolve_profile(&profile, global)
}

/// Apply CLI flag overrides to a profile and translate it.
fn resolve_profile(profile: &Profile, global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    let mut profile = profile.clone();
    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }

    let mut config = upkeep_config::profile_to_monitor_config(&profile).map_err(|e| match e {
        upkeep_config::ConfigError::Validation { field, reason } => {
            CliError::Validation { field, reason }
        }
        other => CliError::Config(other),
    })?;

    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    config.timeout = Duration::from_secs(global.timeout);
    Ok(config)
}
