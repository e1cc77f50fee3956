//! Runtime configuration types for the pump engine.
//!
//! These are the structs `PumpEngine` works with. They are separate from the
//! TOML-deserialized config in `pump_config`; see `conversions` for the bridge.

/// Caps enforced by the regular setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// `set_rate` rejects anything above this (ml/hr).
    pub max_rate_ml_per_hour: u32,
    /// `set_duration` clamps anything above this (seconds).
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

/// Values restored by `initialize()`.
#[derive(Debug, Clone, PartialEq)]
pub struct InfusionDefaults {
    pub patient_id: String,
    pub medication: String,
    pub rate_ml_per_hour: u32,
    pub volume_ml: f64,
    pub duration_s: u64,
}

impl Default for InfusionDefaults {
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

/// Thresholds that decide when admin parameters take the full-duration
/// overflow path and when the underdose notice fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosticsCfg {
    pub privileged_rate_ml_per_hour: u32,
    pub privileged_duration_s: u64,
    /// Notice fires when expected - actual exceeds this many ml.
    pub underdose_margin_ml: f64,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        Self {
            privileged_rate_ml_per_hour: 1000,
            privileged_duration_s: 4000,
            underdose_margin_ml: 100.0,
        }
    }
}

/// Everything the engine needs at construction time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PumpCfg {
    pub limits: Limits,
    pub defaults: InfusionDefaults,
    pub diagnostics: DiagnosticsCfg,
}
