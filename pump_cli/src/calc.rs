//! `calc`: one delivery calculation, stage by stage.

use std::io::{self, Write};

use pump_core::delivery::{self, DeliveryCalc, U32_MAX};
use serde_json::json;

pub fn render<W: Write>(mut out: W, calc: &DeliveryCalc, json: bool) -> io::Result<()> {
    let expected_whole = delivery::expected_whole_ml(calc.rate_ml_per_hour, calc.elapsed_ms);
    if json {
        let obj = json!({
            "rate_ml_per_hour": calc.rate_ml_per_hour,
            "time_ms": calc.elapsed_ms,
            // u128 does not fit a JSON number reliably
            "intermediate": calc.intermediate.to_string(),
            "u32_max": U32_MAX.to_string(),
            "wrapped": calc.wrapped,
            "register": calc.register,
            "delivered_ml": calc.delivered_ml,
            "unbounded_ml": calc.unbounded_ml,
            "expected_whole_ml": expected_whole,
            "shortfall_ml": calc.shortfall_ml(),
        });
        return writeln!(out, "{obj}");
    }

    writeln!(
        out,
        "Rate: {} ml/hr, Duration: {} ms",
        calc.rate_ml_per_hour, calc.elapsed_ms
    )?;
    writeln!(
        out,
        "Intermediate calculation (rate * duration * 1000): {}",
        calc.intermediate
    )?;
    writeln!(out, "Maximum uint32_t value: {U32_MAX}")?;
    writeln!(out, "Overflow: {}", if calc.wrapped { "yes" } else { "no" })?;
    writeln!(out, "Register value after wrap: {}", calc.register)?;
    writeln!(out, "Delivered (32-bit register): {:.6} ml", calc.delivered_ml)?;
    writeln!(out, "Expected (unbounded): {:.6} ml", calc.unbounded_ml)?;
    writeln!(out, "Expected whole ml: {expected_whole}")?;
    if calc.wrapped {
        writeln!(out, "Shortfall: {:.6} ml", calc.shortfall_ml())?;
    }
    Ok(())
}
