//! The infusion state machine (`PumpEngine`).
//!
//! Owns the single `InfusionState`, applies the regular-path caps, accepts
//! unchecked admin parameters, and advances delivery one tick at a time.
//! Nothing here sleeps or reads a clock; the caller decides the cadence and
//! passes the elapsed slice to [`PumpEngine::advance`].
//!
//! Console output is not printed. Each notable transition pushes a
//! [`PumpEvent`] that the caller collects with [`PumpEngine::drain_events`],
//! and is mirrored to `tracing`.

use crate::auth;
use crate::config::{DiagnosticsCfg, InfusionDefaults, Limits, PumpCfg};
use crate::delivery::{self, DeliveryCalc};
use crate::error::PumpError;
use crate::events::{PumpEvent, UnderdoseDiagnostic};
use crate::state::InfusionState;
use crate::status::{InfusionStatus, PumpPhase, StartOutcome, StartReport};

/// Slices longer than this get the expected-vs-actual debug trace in
/// privileged mode.
const LONG_SLICE_MS: u64 = 1_000_000;

pub struct PumpEngine {
    cfg: PumpCfg,
    state: InfusionState,
    events: Vec<PumpEvent>,
}

impl core::fmt::Debug for PumpEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PumpEngine")
            .field("rate_ml_per_hour", &self.state.rate_ml_per_hour)
            .field("volume_to_infuse_ml", &self.state.volume_to_infuse_ml)
            .field("volume_infused_ml", &self.state.volume_infused_ml)
            .field("is_running", &self.state.is_running)
            .field("is_privileged_mode", &self.state.is_privileged_mode)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl Default for PumpEngine {
    fn default() -> Self {
        Self::new(PumpCfg::default())
    }
}

impl PumpEngine {
    /// Engine holding the configured defaults. No event is emitted; call
    /// [`initialize`](Self::initialize) to announce power-on.
    pub fn new(cfg: PumpCfg) -> Self {
        let state = InfusionState::from_defaults(&cfg.defaults);
        Self {
            cfg,
            state,
            events: Vec::new(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.cfg.limits
    }

    pub fn defaults(&self) -> &InfusionDefaults {
        &self.cfg.defaults
    }

    pub fn diagnostics(&self) -> &DiagnosticsCfg {
        &self.cfg.diagnostics
    }

    fn emit(&mut self, event: PumpEvent) {
        self.events.push(event);
    }

    /// Take every event produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<PumpEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Configuration ───────────────────────────────────────────────────────

    /// Restore every field to the configured defaults.
    pub fn initialize(&mut self) {
        self.state = InfusionState::from_defaults(&self.cfg.defaults);
        tracing::info!(
            rate_ml_per_hour = self.state.rate_ml_per_hour,
            volume_ml = self.state.volume_to_infuse_ml,
            duration_s = self.state.duration_seconds,
            "pump initialized"
        );
        self.emit(PumpEvent::Initialized);
    }

    /// Store `rate` if it is within the regular cap.
    ///
    /// On rejection nothing changes, not even the privileged flag. Duration is
    /// not rederived here; callers that want the volume/duration pair kept in
    /// step call [`set_volume`](Self::set_volume) afterwards.
    pub fn set_rate(&mut self, rate_ml_per_hour: u32) -> Result<(), PumpError> {
        let max = self.cfg.limits.max_rate_ml_per_hour;
        if rate_ml_per_hour > max {
            tracing::warn!(requested = rate_ml_per_hour, max, "rate rejected");
            self.emit(PumpEvent::RateRejected {
                requested: rate_ml_per_hour,
                max,
            });
            return Err(PumpError::RateExceedsLimit {
                requested: rate_ml_per_hour,
                max,
            });
        }
        self.state.rate_ml_per_hour = rate_ml_per_hour;
        self.state.is_privileged_mode = false;
        tracing::info!(rate_ml_per_hour, "rate set");
        Ok(())
    }

    /// Store the target volume and rederive duration from the current rate.
    pub fn set_volume(&mut self, volume_ml: f64) {
        self.state.volume_to_infuse_ml = volume_ml;
        self.state.is_privileged_mode = false;
        if self.state.rate_ml_per_hour > 0 {
            let duration_ms =
                delivery::duration_ms_for_volume(volume_ml, self.state.rate_ml_per_hour);
            self.state.duration_seconds = duration_ms / 1000;
        }
        tracing::info!(
            volume_ml,
            duration_s = self.state.duration_seconds,
            "volume set"
        );
    }

    /// Store the duration (clamped to the regular cap) and rederive volume.
    ///
    /// An over-limit request is not refused: the capped value is applied and
    /// `DurationExceedsLimit` reports what happened.
    pub fn set_duration(&mut self, seconds: u64) -> Result<(), PumpError> {
        let max = self.cfg.limits.max_duration_s;
        let applied = seconds.min(max);
        if applied != seconds {
            tracing::warn!(requested = seconds, applied, "duration clamped");
            self.emit(PumpEvent::DurationClamped {
                requested: seconds,
                max,
            });
        }

        self.state.duration_seconds = applied;
        self.state.is_privileged_mode = false;
        if self.state.rate_ml_per_hour > 0 {
            self.state.volume_to_infuse_ml = delivery::volume_ml_for_duration(
                self.state.rate_ml_per_hour,
                self.state.duration_ms(),
            );
        }
        tracing::info!(
            duration_s = applied,
            volume_ml = self.state.volume_to_infuse_ml,
            "duration set"
        );

        if applied == seconds {
            Ok(())
        } else {
            Err(PumpError::DurationExceedsLimit {
                requested: seconds,
                applied,
            })
        }
    }

    pub fn set_patient_id(&mut self, patient_id: impl Into<String>) {
        self.state.patient_id = patient_id.into();
    }

    pub fn set_medication(&mut self, medication: impl Into<String>) {
        self.state.medication = medication.into();
    }

    /// Overwrite rate, volume and duration with no caps and no
    /// cross-derivation, and enter privileged mode.
    ///
    /// Callers are expected to have checked the admin credential first.
    pub fn inject_admin_parameters(&mut self, rate_ml_per_hour: u32, volume_ml: f64, seconds: u64) {
        self.state.rate_ml_per_hour = rate_ml_per_hour;
        self.state.volume_to_infuse_ml = volume_ml;
        self.state.duration_seconds = seconds;
        self.state.is_privileged_mode = true;
        tracing::info!(
            rate_ml_per_hour,
            volume_ml,
            duration_s = seconds,
            "admin parameters set"
        );
        self.emit(PumpEvent::AdminParametersSet {
            rate_ml_per_hour,
            volume_ml,
            duration_s: seconds,
        });
    }

    // ── Delivery arithmetic ─────────────────────────────────────────────────

    /// Volume delivered over `delta_ms` at the current rate, including the
    /// 32-bit register wrap. Same calculation in every mode.
    pub fn compute_delivery_volume(&self, delta_ms: u64) -> f64 {
        let calc = self.delivery_breakdown(delta_ms);
        if calc.wrapped {
            tracing::debug!(
                rate_ml_per_hour = calc.rate_ml_per_hour,
                delta_ms,
                intermediate = %calc.intermediate,
                register = calc.register,
                "delivery register wrapped"
            );
        }
        if self.state.is_privileged_mode && delta_ms > LONG_SLICE_MS {
            tracing::debug!(
                expected_ml = calc.unbounded_ml,
                actual_ml = calc.delivered_ml,
                "long-slice delivery comparison"
            );
        }
        calc.delivered_ml
    }

    /// Every intermediate stage of [`compute_delivery_volume`](Self::compute_delivery_volume).
    pub fn delivery_breakdown(&self, delta_ms: u64) -> DeliveryCalc {
        delivery::breakdown(self.state.rate_ml_per_hour, delta_ms)
    }

    /// Privileged parameters large enough to take the full-duration path.
    fn on_admin_overflow_path(&self) -> bool {
        let d = &self.cfg.diagnostics;
        self.state.is_privileged_mode
            && (self.state.rate_ml_per_hour >= d.privileged_rate_ml_per_hour
                || self.state.duration_seconds >= d.privileged_duration_s)
    }

    /// Compare the unbounded whole-ml target with the wrapped full-duration
    /// delivery. `Some` when the shortfall exceeds the configured margin.
    pub fn underdose_check(&self) -> Option<UnderdoseDiagnostic> {
        let duration_ms = self.state.duration_ms();
        let expected_ml = delivery::expected_whole_ml(self.state.rate_ml_per_hour, duration_ms);
        let actual_ml = delivery::delivery_volume_ml(self.state.rate_ml_per_hour, duration_ms);
        tracing::debug!(expected_ml, actual_ml, "underdose check");
        if expected_ml > actual_ml
            && expected_ml - actual_ml > self.cfg.diagnostics.underdose_margin_ml
        {
            Some(UnderdoseDiagnostic {
                expected_ml,
                actual_ml,
            })
        } else {
            None
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    pub fn start(&mut self) -> StartOutcome {
        if self.state.is_running {
            tracing::warn!("start ignored: infusion already in progress");
            self.emit(PumpEvent::AlreadyRunning);
            return StartOutcome::AlreadyRunning;
        }

        let admin_override = self.on_admin_overflow_path();
        if admin_override {
            let volume = self.compute_delivery_volume(self.state.duration_ms());
            self.state.volume_to_infuse_ml = volume;
            tracing::info!(volume_ml = volume, "admin parameters drive target volume");
            self.emit(PumpEvent::AdminModeEngaged {
                volume_to_infuse_ml: volume,
            });
        }

        self.state.run_ticks = 0;
        self.state.is_running = true;

        let report = StartReport {
            patient_id: self.state.patient_id.clone(),
            medication: self.state.medication.clone(),
            rate_ml_per_hour: self.state.rate_ml_per_hour,
            volume_to_infuse_ml: self.state.volume_to_infuse_ml,
            duration_seconds: self.state.duration_seconds,
            admin_override,
        };
        tracing::info!(
            patient_id = %report.patient_id,
            medication = %report.medication,
            rate_ml_per_hour = report.rate_ml_per_hour,
            volume_ml = report.volume_to_infuse_ml,
            duration_s = report.duration_seconds,
            admin_override,
            "infusion started"
        );
        self.emit(PumpEvent::Started(report.clone()));
        StartOutcome::Started(report)
    }

    /// Halt a running infusion. Returns `false` (and does nothing) when idle.
    pub fn stop(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }
        self.state.is_running = false;
        tracing::info!(
            volume_infused_ml = self.state.volume_infused_ml,
            elapsed_ms = self.state.elapsed_time_ms,
            "infusion stopped"
        );
        self.emit(PumpEvent::Stopped);
        true
    }

    /// One delivery tick covering `delta_ms` of simulated time.
    pub fn advance(&mut self, delta_ms: u64) -> InfusionStatus {
        if !self.state.is_running {
            return InfusionStatus::Idle;
        }

        self.state.elapsed_time_ms = self.state.elapsed_time_ms.saturating_add(delta_ms);
        self.state.run_ticks = self.state.run_ticks.saturating_add(1);
        let delivered = self.compute_delivery_volume(delta_ms);

        // one-shot notice on the first tick of a run
        if self.state.run_ticks == 1
            && self.on_admin_overflow_path()
            && let Some(diag) = self.underdose_check()
        {
            tracing::warn!(
                expected_ml = diag.expected_ml,
                actual_ml = diag.actual_ml,
                shortfall_ml = diag.shortfall_ml(),
                "calculation anomaly: underdose possible"
            );
            self.emit(PumpEvent::UnderdoseAnomaly(diag));
        }

        self.state.volume_infused_ml += delivered;
        tracing::trace!(
            tick = self.state.run_ticks,
            delta_ms,
            delivered_ml = delivered,
            infused_ml = self.state.volume_infused_ml,
            elapsed_ms = self.state.elapsed_time_ms,
            "tick"
        );

        if self.state.volume_infused_ml >= self.state.volume_to_infuse_ml {
            self.state.is_running = false;
            let delivered_ml = self.state.volume_infused_ml;
            tracing::info!(
                delivered_ml,
                elapsed_ms = self.state.elapsed_time_ms,
                ticks = self.state.run_ticks,
                "infusion complete"
            );
            self.emit(PumpEvent::Completed { delivered_ml });
            return InfusionStatus::Complete { delivered_ml };
        }
        InfusionStatus::Running
    }

    // ── Admin credential ────────────────────────────────────────────────────

    pub fn validate_admin_credential(&self, candidate: &str) -> bool {
        auth::validate_admin_credential(candidate)
    }

    /// Credential check as a `Result` for `?` at call sites.
    pub fn authorize_admin(&self, candidate: &str) -> Result<(), PumpError> {
        if auth::validate_admin_credential(candidate) {
            Ok(())
        } else {
            tracing::warn!("admin credential rejected");
            Err(PumpError::InvalidCredential)
        }
    }

    // ── Getters ─────────────────────────────────────────────────────────────

    pub fn phase(&self) -> PumpPhase {
        if self.state.is_running {
            PumpPhase::Running
        } else if self.state.volume_infused_ml > 0.0
            && self.state.volume_infused_ml >= self.state.volume_to_infuse_ml
        {
            PumpPhase::Completed
        } else {
            PumpPhase::Idle
        }
    }

    pub fn rate_ml_per_hour(&self) -> u32 {
        self.state.rate_ml_per_hour
    }

    pub fn volume_to_infuse_ml(&self) -> f64 {
        self.state.volume_to_infuse_ml
    }

    pub fn volume_infused_ml(&self) -> f64 {
        self.state.volume_infused_ml
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn elapsed_time_ms(&self) -> u64 {
        self.state.elapsed_time_ms
    }

    pub fn duration_seconds(&self) -> u64 {
        self.state.duration_seconds
    }

    pub fn duration_ms(&self) -> u64 {
        self.state.duration_ms()
    }

    pub fn patient_id(&self) -> &str {
        &self.state.patient_id
    }

    pub fn medication(&self) -> &str {
        &self.state.medication
    }

    pub fn is_privileged_mode(&self) -> bool {
        self.state.is_privileged_mode
    }

    /// Ticks advanced since the last `start`.
    pub fn run_ticks(&self) -> u64 {
        self.state.run_ticks
    }

    pub fn snapshot(&self) -> InfusionState {
        self.state.clone()
    }
}
