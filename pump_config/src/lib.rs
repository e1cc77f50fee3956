#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the infusion pump simulator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; an empty document yields the factory
//!   settings of the SPQR-IPF-2025 firmware (rate 100 ml/hr, 500 ml,
//!   5000 s, 999 ml/hr and 3600 s caps on the regular path).
use serde::Deserialize;
use std::path::Path;

/// Caps enforced on the regular (non-admin) configuration path.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Limits {
    pub max_rate_ml_per_hour: u32,
    pub max_duration_s: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rate_ml_per_hour: 999,
            max_duration_s: 3600,
        }
    }
}

/// Values applied by `initialize()`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Defaults {
    pub patient_id: String,
    pub medication: String,
    pub rate_ml_per_hour: u32,
    pub volume_ml: f64,
    pub duration_s: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            patient_id: "UNKNOWN".to_string(),
            medication: "SALINE".to_string(),
            rate_ml_per_hour: 100,
            volume_ml: 500.0,
            duration_s: 5000,
        }
    }
}

/// Thresholds for the admin-mode overflow path and the underdose notice.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Diagnostics {
    /// Admin rate at or above which the full-duration recomputation kicks in
    pub privileged_rate_ml_per_hour: u32,
    /// Admin duration (s) at or above which the full-duration recomputation kicks in
    pub privileged_duration_s: u64,
    /// Report an anomaly when expected exceeds actual by more than this (ml)
    pub underdose_margin_ml: f64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            privileged_rate_ml_per_hour: 1000,
            privileged_duration_s: 4000,
            underdose_margin_ml: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Simulation {
    /// Simulated milliseconds per delivery tick (reference cadence: 500 ms)
    pub tick_ms: u64,
    /// Time slice for one "Run Infusion Cycle" console command (5 minutes)
    pub console_cycle_ms: u64,
    /// Driver gives up after this many ticks (a zero rate never completes)
    pub max_ticks: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            console_cycle_ms: 300_000,
            max_ticks: 1_000_000,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub defaults: Defaults,
    pub diagnostics: Diagnostics,
    pub simulation: Simulation,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Defaults
        if !self.defaults.volume_ml.is_finite() {
            eyre::bail!("defaults.volume_ml must be finite");
        }
        if self.defaults.volume_ml < 0.0 {
            eyre::bail!("defaults.volume_ml must be >= 0.0");
        }

        // Diagnostics
        let margin = self.diagnostics.underdose_margin_ml;
        if !margin.is_finite() || margin < 0.0 {
            eyre::bail!("diagnostics.underdose_margin_ml must be a finite value >= 0.0");
        }

        // Simulation
        if self.simulation.tick_ms == 0 {
            eyre::bail!("simulation.tick_ms must be >= 1");
        }
        if self.simulation.console_cycle_ms == 0 {
            eyre::bail!("simulation.console_cycle_ms must be >= 1");
        }
        if self.simulation.max_ticks == 0 {
            eyre::bail!("simulation.max_ticks must be >= 1");
        }
        if self.simulation.tick_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("simulation.tick_ms is unreasonably large (>24h)");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_factory_settings() {
        let cfg = load_toml("").expect("empty TOML parses");
        assert_eq!(cfg.limits.max_rate_ml_per_hour, 999);
        assert_eq!(cfg.limits.max_duration_s, 3600);
        assert_eq!(cfg.defaults.patient_id, "UNKNOWN");
        assert_eq!(cfg.defaults.medication, "SALINE");
        assert_eq!(cfg.defaults.rate_ml_per_hour, 100);
        assert_eq!(cfg.defaults.duration_s, 5000);
        assert_eq!(cfg.simulation.tick_ms, 500);
        cfg.validate().expect("defaults are valid");
    }
}
