//! Console messages produced by the engine.
//!
//! Every state change worth telling the operator about is recorded as a
//! `PumpEvent`. The driver drains them after each call and renders them; the
//! `Display` impl yields the exact console text, one line per `\n`.

use std::fmt;

use crate::status::StartReport;

/// Display class of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// First-tick comparison between the unbounded reference and the wrapped
/// full-duration delivery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnderdoseDiagnostic {
    pub expected_ml: f64,
    pub actual_ml: f64,
}

impl UnderdoseDiagnostic {
    pub fn shortfall_ml(&self) -> f64 {
        self.expected_ml - self.actual_ml
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PumpEvent {
    Initialized,
    RateRejected {
        requested: u32,
        max: u32,
    },
    DurationClamped {
        requested: u64,
        max: u64,
    },
    AdminParametersSet {
        rate_ml_per_hour: u32,
        volume_ml: f64,
        duration_s: u64,
    },
    AdminModeEngaged {
        volume_to_infuse_ml: f64,
    },
    AlreadyRunning,
    Started(StartReport),
    Stopped,
    Completed {
        delivered_ml: f64,
    },
    UnderdoseAnomaly(UnderdoseDiagnostic),
}

impl PumpEvent {
    /// Stable machine-readable name (used in JSON output).
    pub fn kind(&self) -> &'static str {
        match self {
            PumpEvent::Initialized => "initialized",
            PumpEvent::RateRejected { .. } => "rate_rejected",
            PumpEvent::DurationClamped { .. } => "duration_clamped",
            PumpEvent::AdminParametersSet { .. } => "admin_parameters_set",
            PumpEvent::AdminModeEngaged { .. } => "admin_mode_engaged",
            PumpEvent::AlreadyRunning => "already_running",
            PumpEvent::Started(_) => "started",
            PumpEvent::Stopped => "stopped",
            PumpEvent::Completed { .. } => "completed",
            PumpEvent::UnderdoseAnomaly(_) => "underdose_anomaly",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PumpEvent::RateRejected { .. } | PumpEvent::DurationClamped { .. } => Severity::Error,
            PumpEvent::UnderdoseAnomaly(_) => Severity::Warning,
            PumpEvent::Completed { .. } => Severity::Success,
            _ => Severity::Normal,
        }
    }

    /// Console lines in display order.
    pub fn lines(&self) -> Vec<String> {
        match self {
            PumpEvent::Initialized => vec!["Pump initialized with default settings".to_string()],
            PumpEvent::RateRejected { max, .. } => {
                vec![format!("ERROR: Rate exceeds maximum allowed ({max} ml/hr)")]
            }
            PumpEvent::DurationClamped { max, .. } => vec![format!(
                "ERROR: Duration exceeds maximum allowed ({})",
                describe_duration_limit(*max)
            )],
            PumpEvent::AdminParametersSet { .. } => {
                vec!["ADMIN: Custom parameters have been set".to_string()]
            }
            PumpEvent::AdminModeEngaged { .. } => {
                vec!["ADMIN MODE: Using custom parameters".to_string()]
            }
            PumpEvent::AlreadyRunning => vec!["Infusion already in progress".to_string()],
            PumpEvent::Started(r) => vec![
                "Starting infusion...".to_string(),
                format!("Patient ID: {}", r.patient_id),
                format!("Medication: {}", r.medication),
                format!("Rate: {} ml/hr", r.rate_ml_per_hour),
                format!("Volume to infuse: {} ml", r.volume_to_infuse_ml),
                format!("Duration: {} seconds", r.duration_seconds),
            ],
            PumpEvent::Stopped => vec!["Infusion stopped".to_string()],
            PumpEvent::Completed { delivered_ml } => {
                vec![format!("Infusion complete! Delivered {delivered_ml:.2} ml")]
            }
            PumpEvent::UnderdoseAnomaly(d) => vec![
                "---------------------------------------------".to_string(),
                "System notice: Calculation anomaly detected".to_string(),
                format!("Expected volume: {:.2} ml", d.expected_ml),
                format!("Actual delivery: {:.2} ml", d.actual_ml),
                "MEDICATION UNDERDOSE POSSIBLE - Please contact system administrator".to_string(),
            ],
        }
    }
}

impl fmt::Display for PumpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

/// Render a duration cap the way the operator panel shows it,
/// e.g. `3600` -> `"3,600 seconds / 1 hour"`.
pub fn describe_duration_limit(max_s: u64) -> String {
    let grouped = group_thousands(max_s);
    if max_s > 0 && max_s % 3600 == 0 {
        let hours = max_s / 3600;
        let unit = if hours == 1 { "hour" } else { "hours" };
        format!("{grouped} seconds / {hours} {unit}")
    } else {
        format!("{grouped} seconds")
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_digits() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(3600), "3,600");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn describes_limits() {
        assert_eq!(describe_duration_limit(3600), "3,600 seconds / 1 hour");
        assert_eq!(describe_duration_limit(7200), "7,200 seconds / 2 hours");
        assert_eq!(describe_duration_limit(1800), "1,800 seconds");
    }

    #[test]
    fn anomaly_renders_two_decimals() {
        let ev = PumpEvent::UnderdoseAnomaly(UnderdoseDiagnostic {
            expected_ml: 25_000.0,
            actual_ml: 0.904_244_337_777_777_8,
        });
        let text = ev.to_string();
        assert!(text.contains("Expected volume: 25000.00 ml"));
        assert!(text.contains("Actual delivery: 0.90 ml"));
        assert_eq!(ev.severity(), Severity::Warning);
        assert_eq!(ev.lines().len(), 5);
    }

    #[test]
    fn completion_rounds_to_hundredths() {
        let ev = PumpEvent::Completed {
            delivered_ml: 1.388_888_888_888_889,
        };
        assert_eq!(ev.to_string(), "Infusion complete! Delivered 1.39 ml");
        assert_eq!(ev.severity(), Severity::Success);
    }

    #[test]
    fn start_report_lines() {
        let ev = PumpEvent::Started(StartReport {
            patient_id: "UNKNOWN".into(),
            medication: "SALINE".into(),
            rate_ml_per_hour: 100,
            volume_to_infuse_ml: 500.0,
            duration_seconds: 5000,
            admin_override: false,
        });
        assert_eq!(
            ev.lines(),
            vec![
                "Starting infusion...",
                "Patient ID: UNKNOWN",
                "Medication: SALINE",
                "Rate: 100 ml/hr",
                "Volume to infuse: 500 ml",
                "Duration: 5000 seconds",
            ]
        );
    }
}
