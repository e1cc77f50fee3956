//! Operator-panel rules layered on top of the engine.
//!
//! The panel clamps out-of-range entries before the engine sees them and
//! keeps volume and duration in step after a rate change, which the engine
//! leaves to its caller.

use std::io::{self, Write};

use pump_core::PumpEngine;
use pump_core::delivery::{self, DeliveryCalc};
use pump_core::events::describe_duration_limit;

use crate::output::Printer;

/// Gap between firmware and exact volume that the panel reports.
pub const DISCREPANCY_ML: f64 = 1.0;

pub fn rate_warning(max: u32) -> String {
    format!("WARNING: Rate limited to maximum safe value ({max} ml/hr)")
}

pub fn duration_warning(max_s: u64) -> String {
    format!(
        "WARNING: Duration limited to maximum safe value ({})",
        describe_duration_limit(max_s)
    )
}

/// Clamp, store the rate, then rederive duration from the current volume.
pub fn apply_rate<W: Write>(
    engine: &mut PumpEngine,
    requested: u32,
    out: &mut Printer<W>,
) -> io::Result<()> {
    let max = engine.limits().max_rate_ml_per_hour;
    let rate = if requested > max {
        out.warning(&rate_warning(max))?;
        max
    } else {
        requested
    };
    let stored = engine.set_rate(rate).is_ok();
    if stored && rate > 0 {
        let volume = engine.volume_to_infuse_ml();
        engine.set_volume(volume);
    }
    out.events(&engine.drain_events())?;
    if stored {
        out.notice("rate_set", "normal", &format!("Infusion rate set to {rate} ml/hr"))?;
        if rate > 0 {
            confirm_duration(engine, out)?;
        }
    }
    Ok(())
}

pub fn apply_volume<W: Write>(
    engine: &mut PumpEngine,
    volume_ml: f64,
    out: &mut Printer<W>,
) -> io::Result<()> {
    engine.set_volume(volume_ml);
    out.events(&engine.drain_events())?;
    confirm_volume(engine, out)?;
    if engine.rate_ml_per_hour() > 0 {
        confirm_duration(engine, out)?;
    }
    Ok(())
}

pub fn apply_duration<W: Write>(
    engine: &mut PumpEngine,
    requested_s: u64,
    out: &mut Printer<W>,
) -> io::Result<()> {
    let max = engine.limits().max_duration_s;
    let seconds = if requested_s > max {
        out.warning(&duration_warning(max))?;
        max
    } else {
        requested_s
    };
    if let Err(e) = engine.set_duration(seconds) {
        tracing::warn!(error = %e, "duration adjusted by engine");
    }
    out.events(&engine.drain_events())?;
    confirm_duration(engine, out)?;
    if engine.rate_ml_per_hour() > 0 {
        confirm_volume(engine, out)?;
    }
    Ok(())
}

fn confirm_volume<W: Write>(engine: &PumpEngine, out: &mut Printer<W>) -> io::Result<()> {
    let line = format!(
        "Volume to infuse set to {:.2} ml",
        engine.volume_to_infuse_ml()
    );
    out.notice("volume_set", "normal", &line)
}

fn confirm_duration<W: Write>(engine: &PumpEngine, out: &mut Printer<W>) -> io::Result<()> {
    let line = format!("Duration set to {} seconds", engine.duration_seconds());
    out.notice("duration_set", "normal", &line)
}

/// Compare the firmware's volume for the injected rate and duration with the
/// exact figure, before the infusion starts.
pub fn report_admin_parameters<W: Write>(
    engine: &PumpEngine,
    out: &mut Printer<W>,
) -> io::Result<()> {
    let calc = delivery::breakdown(
        engine.rate_ml_per_hour(),
        engine.duration_seconds().saturating_mul(1000),
    );
    out.notice(
        "admin_calculated",
        "warning",
        &format!("ADMIN: Firmware calculated volume: {:.2} ml", calc.delivered_ml),
    )?;
    out.notice(
        "admin_expected",
        "warning",
        &format!(
            "ADMIN: Mathematically expected volume: {:.2} ml",
            calc.unbounded_ml
        ),
    )?;
    if exceeds_discrepancy(&calc) {
        out.warning(
            "ADMIN WARNING: There is a discrepancy between calculated and expected volumes!",
        )?;
        out.warning("This may indicate a numeric calculation issue in the firmware.")?;
    }
    out.notice(
        "parameters_set",
        "normal",
        "Parameters set. Press Start Infusion to begin.",
    )
}

pub fn exceeds_discrepancy(calc: &DeliveryCalc) -> bool {
    (calc.delivered_ml - calc.unbounded_ml).abs() > DISCREPANCY_ML
}

/// `HH:MM:SS` for a millisecond count.
pub fn format_elapsed(ms: u64) -> String {
    let total = ms / 1000;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    format!("{h:02}:{m:02}:{s:02}")
}
