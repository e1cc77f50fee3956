//! Timing seams shared by the pump engine driver and the CLI.
pub mod clock;

pub use clock::{Clock, MonotonicClock, SimClock};
