//! Reference tick driver.
//!
//! Calls `advance(tick_ms)` on a started engine until it completes, is
//! stopped from outside, or hits the tick cap. Pacing comes from the
//! [`Clock`]: `MonotonicClock` sleeps for real, `SimClock` fast-forwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pump_traits::clock::Clock;

use crate::engine::PumpEngine;
use crate::events::PumpEvent;
use crate::status::InfusionStatus;

/// Reference cadence of the delivery loop.
pub const DEFAULT_TICK_MS: u64 = 500;
pub const DEFAULT_MAX_TICKS: u64 = 1_000_000;

/// Why the driver returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine reached its target volume.
    Completed,
    /// The shutdown flag was raised, or the engine was not running.
    Stopped,
    /// `max_ticks` elapsed first; the engine was stopped.
    TickLimit,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Stopped => "stopped",
            RunOutcome::TickLimit => "tick_limit",
        }
    }
}

/// State after one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickRecord {
    pub tick: u64,
    pub delta_ms: u64,
    pub elapsed_ms: u64,
    /// Volume added by this tick.
    pub delivered_ml: f64,
    pub volume_infused_ml: f64,
    pub volume_to_infuse_ml: f64,
    /// True when this tick's delivery went through the 32-bit wrap.
    pub wrapped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Simulated time accumulated by the engine.
    pub elapsed_ms: u64,
    /// Time measured on the driver's clock.
    pub clock_ms: u64,
    pub volume_infused_ml: f64,
    pub volume_to_infuse_ml: f64,
    pub outcome: RunOutcome,
}

pub struct TickDriver<C: Clock> {
    clock: C,
    tick_ms: u64,
    max_ticks: u64,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<C: Clock> core::fmt::Debug for TickDriver<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TickDriver")
            .field("tick_ms", &self.tick_ms)
            .field("max_ticks", &self.max_ticks)
            .field("has_shutdown", &self.shutdown.is_some())
            .finish()
    }
}

impl<C: Clock> TickDriver<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            tick_ms: DEFAULT_TICK_MS,
            max_ticks: DEFAULT_MAX_TICKS,
            shutdown: None,
        }
    }

    /// Cadence and cap from the `[simulation]` config section.
    pub fn from_config(clock: C, sim: &pump_config::Simulation) -> Self {
        Self::new(clock)
            .with_tick_ms(sim.tick_ms)
            .with_max_ticks(sim.max_ticks)
    }

    /// Zero is bumped to 1 ms.
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms.max(1);
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Flag polled between ticks; when raised the engine is stopped.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Drive `engine` until it is no longer running.
    ///
    /// `on_tick` sees every tick with the events that tick produced. Events
    /// raised while stopping (shutdown or tick cap) stay queued on the engine.
    pub fn run<F>(&self, engine: &mut PumpEngine, mut on_tick: F) -> RunSummary
    where
        F: FnMut(&TickRecord, &[PumpEvent]),
    {
        let epoch = self.clock.now();
        let tick = Duration::from_millis(self.tick_ms);
        let mut ticks = 0u64;

        tracing::info!(
            tick_ms = self.tick_ms,
            max_ticks = self.max_ticks,
            "tick driver start"
        );

        let outcome = loop {
            if !engine.is_running() {
                break RunOutcome::Stopped;
            }
            if self.shutdown_requested() {
                tracing::warn!(ticks, "shutdown requested; stopping infusion");
                engine.stop();
                break RunOutcome::Stopped;
            }
            if ticks >= self.max_ticks {
                tracing::warn!(ticks, "tick limit reached; stopping infusion");
                engine.stop();
                break RunOutcome::TickLimit;
            }

            self.clock.sleep(tick);
            let before = engine.volume_infused_ml();
            let wrapped = engine.delivery_breakdown(self.tick_ms).wrapped;
            let status = engine.advance(self.tick_ms);
            ticks += 1;

            let record = TickRecord {
                tick: ticks,
                delta_ms: self.tick_ms,
                elapsed_ms: engine.elapsed_time_ms(),
                delivered_ml: engine.volume_infused_ml() - before,
                volume_infused_ml: engine.volume_infused_ml(),
                volume_to_infuse_ml: engine.volume_to_infuse_ml(),
                wrapped,
            };
            let events = engine.drain_events();
            on_tick(&record, &events);

            if let InfusionStatus::Complete { .. } = status {
                break RunOutcome::Completed;
            }
        };

        let summary = RunSummary {
            ticks,
            elapsed_ms: engine.elapsed_time_ms(),
            clock_ms: self.clock.ms_since(epoch),
            volume_infused_ml: engine.volume_infused_ml(),
            volume_to_infuse_ml: engine.volume_to_infuse_ml(),
            outcome,
        };
        tracing::info!(
            ticks,
            elapsed_ms = summary.elapsed_ms,
            volume_infused_ml = summary.volume_infused_ml,
            outcome = summary.outcome.as_str(),
            "tick driver done"
        );
        summary
    }
}
