#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Infusion pump firmware simulation engine (hardware-agnostic).
//!
//! Models the control firmware of the SPQR-IPF-2025 pump: parameter setters
//! with regular-path caps, an unchecked admin injection path, and a
//! time-stepped delivery loop.
//!
//! ## Architecture
//!
//! - **Engine**: `PumpEngine` owns the `InfusionState` (`engine`, `state`)
//! - **Delivery**: the `rate * ms * 1000` calculation in a 32-bit register (`delivery`)
//! - **Events**: console messages with severities (`events`)
//! - **Configuration**: runtime caps, defaults, thresholds (`config`, `conversions`)
//! - **Driver**: clock-paced tick loop (`runner`)
//!
//! ## Register arithmetic
//!
//! The delivery product is formed exactly in `u128` and reduced modulo 2^32
//! when it exceeds `u32::MAX`. Under UI caps (999 ml/hr, 500 ms ticks) it
//! never wraps; admin parameters over a full duration usually do, and the
//! target volume collapses to a fraction of what was prescribed.

pub mod auth;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod events;
pub mod logger;
pub mod runner;
pub mod state;
pub mod status;

pub use auth::{ADMIN_CREDENTIAL, validate_admin_credential};
pub use builder::PumpEngineBuilder;
pub use config::{DiagnosticsCfg, InfusionDefaults, Limits, PumpCfg};
pub use delivery::DeliveryCalc;
pub use engine::PumpEngine;
pub use error::{BuildError, PumpError, Result};
pub use events::{PumpEvent, Severity, UnderdoseDiagnostic};
pub use runner::{RunOutcome, RunSummary, TickDriver, TickRecord};
pub use state::InfusionState;
pub use status::{InfusionStatus, PumpPhase, StartOutcome, StartReport};
