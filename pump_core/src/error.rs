use thiserror::Error;

/// Operator errors on the regular configuration path.
///
/// None of these are fatal: the engine stays usable and the caller decides
/// how to surface the condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PumpError {
    /// Rate above the regular-path cap; the stored rate is left unchanged.
    #[error("rate {requested} ml/hr exceeds maximum allowed ({max} ml/hr)")]
    RateExceedsLimit { requested: u32, max: u32 },
    /// Duration above the regular-path cap; `applied` has already been stored.
    #[error("duration {requested} s exceeds maximum allowed, clamped to {applied} s")]
    DurationExceedsLimit { requested: u64, applied: u64 },
    #[error("invalid admin credential")]
    InvalidCredential,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
