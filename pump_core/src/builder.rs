//! Builder for `PumpEngine`.
//!
//! Every section is optional and falls back to the factory settings;
//! `build()` validates the combination before constructing the engine.

use crate::config::{DiagnosticsCfg, InfusionDefaults, Limits, PumpCfg};
use crate::engine::PumpEngine;
use crate::error::{BuildError, Result};

/// Builder for `PumpEngine`. All fields are validated on `build()`.
#[derive(Debug, Default, Clone)]
pub struct PumpEngineBuilder {
    limits: Option<Limits>,
    defaults: Option<InfusionDefaults>,
    diagnostics: Option<DiagnosticsCfg>,
}

impl PumpEngine {
    /// Start building a PumpEngine.
    pub fn builder() -> PumpEngineBuilder {
        PumpEngineBuilder::default()
    }
}

impl PumpEngineBuilder {
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_defaults(mut self, defaults: InfusionDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsCfg) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Take all three sections from a loaded TOML config.
    pub fn with_config(self, cfg: &pump_config::Config) -> Self {
        self.with_limits(Limits::from(&cfg.limits))
            .with_defaults(InfusionDefaults::from(&cfg.defaults))
            .with_diagnostics(DiagnosticsCfg::from(&cfg.diagnostics))
    }

    pub fn build(self) -> Result<PumpEngine> {
        let cfg = PumpCfg {
            limits: self.limits.unwrap_or_default(),
            defaults: self.defaults.unwrap_or_default(),
            diagnostics: self.diagnostics.unwrap_or_default(),
        };
        validate(&cfg)?;
        Ok(PumpEngine::new(cfg))
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(cfg: &PumpCfg) -> Result<()> {
    let d = &cfg.defaults;
    if !d.volume_ml.is_finite() {
        return Err(invalid("default volume must be finite"));
    }
    if d.volume_ml.is_sign_negative() {
        return Err(invalid("default volume must be >= 0"));
    }

    let margin = cfg.diagnostics.underdose_margin_ml;
    if !margin.is_finite() || margin.is_sign_negative() {
        return Err(invalid("underdose margin must be a finite value >= 0"));
    }
    Ok(())
}
