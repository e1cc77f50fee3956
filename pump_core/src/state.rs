//! The single mutable infusion record owned by `PumpEngine`.

use crate::config::InfusionDefaults;

/// Snapshot of everything the pump knows about the current infusion.
///
/// Only whole seconds of duration are stored; [`InfusionState::duration_ms`]
/// derives milliseconds so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct InfusionState {
    pub patient_id: String,
    pub medication: String,
    pub rate_ml_per_hour: u32,
    pub volume_to_infuse_ml: f64,
    pub duration_seconds: u64,
    pub volume_infused_ml: f64,
    pub is_running: bool,
    pub elapsed_time_ms: u64,
    /// Set only by admin parameter injection; cleared by every regular setter.
    pub is_privileged_mode: bool,
    /// `advance` calls since the last `start`.
    pub run_ticks: u64,
}

impl InfusionState {
    pub fn from_defaults(d: &InfusionDefaults) -> Self {
        Self {
            patient_id: d.patient_id.clone(),
            medication: d.medication.clone(),
            rate_ml_per_hour: d.rate_ml_per_hour,
            volume_to_infuse_ml: d.volume_ml,
            duration_seconds: d.duration_s,
            volume_infused_ml: 0.0,
            is_running: false,
            elapsed_time_ms: 0,
            is_privileged_mode: false,
            run_ticks: 0,
        }
    }

    #[inline]
    pub fn duration_ms(&self) -> u64 {
        self.duration_seconds.saturating_mul(1000)
    }
}

impl Default for InfusionState {
    fn default() -> Self {
        Self::from_defaults(&InfusionDefaults::default())
    }
}
