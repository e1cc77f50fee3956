//! Results returned by the engine's lifecycle operations.

/// Outcome of a single `advance` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InfusionStatus {
    /// Pump was not running; nothing happened.
    Idle,
    /// Volume accrued; target not reached yet.
    Running,
    /// Target reached on this tick; the pump has stopped itself.
    Complete { delivered_ml: f64 },
}

/// Coarse lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpPhase {
    Idle,
    Running,
    /// Idle with the infused volume at or above the target.
    Completed,
}

/// Parameters echoed when an infusion starts.
#[derive(Debug, Clone, PartialEq)]
pub struct StartReport {
    pub patient_id: String,
    pub medication: String,
    pub rate_ml_per_hour: u32,
    pub volume_to_infuse_ml: f64,
    pub duration_seconds: u64,
    /// True when the target volume was recomputed from admin parameters.
    pub admin_override: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started(StartReport),
    AlreadyRunning,
}
