// ── Settings domain types ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Warning/critical threshold pair for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdBand {
    /// A band is valid when both values are finite and warning sits below
    /// critical.
    pub fn validate(&self, metric: &str) -> Result<(), CoreError> {
        if !self.warning.is_finite() || !self.critical.is_finite() {
            return Err(CoreError::Validation {
                message: format!("thresholds for '{metric}' must be finite numbers"),
            });
        }
        if self.warning >= self.critical {
            return Err(CoreError::Validation {
                message: format!(
                    "warning threshold for '{metric}' ({}) must be below critical ({})",
                    self.warning, self.critical
                ),
            });
        }
        Ok(())
    }
}

/// Notification channel toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    pub email: bool,
    pub sms: bool,
}

/// Threshold configuration mirrored from `GET /settings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub thresholds: BTreeMap<String, ThresholdBand>,
    pub notifications: Notifications,
}

impl Settings {
    /// Validate every band before a `POST /settings`.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (metric, band) in &self.thresholds {
            band.validate(metric)?;
        }
        Ok(())
    }
}
