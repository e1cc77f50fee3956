//! `From` implementations bridging `pump_config` types to `pump_core` types.

use crate::config::{DiagnosticsCfg, InfusionDefaults, Limits, PumpCfg};

// ── Limits ───────────────────────────────────────────────────────────────────

impl From<&pump_config::Limits> for Limits {
    fn from(c: &pump_config::Limits) -> Self {
        Self {
            max_rate_ml_per_hour: c.max_rate_ml_per_hour,
            max_duration_s: c.max_duration_s,
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

impl From<&pump_config::Defaults> for InfusionDefaults {
    fn from(c: &pump_config::Defaults) -> Self {
        Self {
            patient_id: c.patient_id.clone(),
            medication: c.medication.clone(),
            rate_ml_per_hour: c.rate_ml_per_hour,
            volume_ml: c.volume_ml,
            duration_s: c.duration_s,
        }
    }
}

// ── Diagnostics ──────────────────────────────────────────────────────────────

impl From<&pump_config::Diagnostics> for DiagnosticsCfg {
    fn from(c: &pump_config::Diagnostics) -> Self {
        Self {
            privileged_rate_ml_per_hour: c.privileged_rate_ml_per_hour,
            privileged_duration_s: c.privileged_duration_s,
            underdose_margin_ml: c.underdose_margin_ml,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&pump_config::Config> for PumpCfg {
    fn from(c: &pump_config::Config) -> Self {
        Self {
            limits: (&c.limits).into(),
            defaults: (&c.defaults).into(),
            diagnostics: (&c.diagnostics).into(),
        }
    }
}
