//! Human-readable error descriptions and structured JSON error formatting.

use pump_core::error::{BuildError, PumpError};

use crate::run::RunError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [limits], [defaults] or [diagnostics] tables.\nHow to fix: Edit the config file, then rerun. See etc/pump_config.toml for a sample."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PumpError>() {
        return match pe {
            PumpError::InvalidCredential => "Invalid password. Access denied.".to_string(),
            PumpError::RateExceedsLimit { max, .. } => format!(
                "What happened: Rate exceeds maximum allowed ({max} ml/hr).\nHow to fix: Choose a rate at or below the limit, or use admin-run."
            ),
            PumpError::DurationExceedsLimit { applied, .. } => format!(
                "What happened: Duration exceeds maximum allowed and was clamped to {applied} seconds.\nHow to fix: Choose a shorter duration."
            ),
        };
    }

    if let Some(RunError::TickLimit {
        ticks,
        volume_infused_ml,
        volume_to_infuse_ml,
    }) = err.downcast_ref::<RunError>()
    {
        return format!(
            "What happened: The tick limit ({ticks}) was reached with {volume_infused_ml:.2} of {volume_to_infuse_ml:.2} ml infused.\nLikely causes: A zero rate, or a target too large for the simulated time budget.\nHow to fix: Set a non-zero rate, or raise simulation.max_ticks / --max-ticks."
        );
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("parse config") || lower.contains("read config") {
        return format!(
            "What happened: The config file could not be loaded ({msg}).\nHow to fix: Check the path and the TOML syntax."
        );
    }

    if lower.contains("simulation.")
        || lower.contains("limits.")
        || lower.contains("defaults.")
        || lower.contains("diagnostics.")
        || lower.contains("logging.")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes; anything unclassified is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if matches!(
        err.downcast_ref::<PumpError>(),
        Some(PumpError::InvalidCredential)
    ) {
        return 3;
    }
    if err.downcast_ref::<RunError>().is_some() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(pe) = err.downcast_ref::<PumpError>() {
        return match pe {
            PumpError::InvalidCredential => "InvalidCredential",
            PumpError::RateExceedsLimit { .. } => "RateExceedsLimit",
            PumpError::DurationExceedsLimit { .. } => "DurationExceedsLimit",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    if err.downcast_ref::<RunError>().is_some() {
        return "TickLimit";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(RunError::TickLimit {
        ticks,
        volume_infused_ml,
        volume_to_infuse_ml,
    }) = err.downcast_ref::<RunError>()
    {
        return json!({
            "reason": "TickLimit",
            "details": {
                "ticks": ticks,
                "volume_infused_ml": volume_infused_ml,
                "volume_to_infuse_ml": volume_to_infuse_ml,
            },
            "message": humanize(err),
        })
        .to_string();
    }

    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
