//! Console rendering: plain text lines or one JSON object per message.

use std::io::{self, Write};

use pump_core::logger::{FileLogger, Logger};
use pump_core::{PumpEvent, RunSummary};
use serde_json::json;

use crate::panel::format_elapsed;

pub struct Printer<W: Write> {
    out: W,
    json: bool,
    transcript: Option<FileLogger>,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self {
            out,
            json,
            transcript: None,
        }
    }

    pub fn with_transcript(mut self, logger: Option<FileLogger>) -> Self {
        self.transcript = logger;
        self
    }

    pub fn event(&mut self, ev: &PumpEvent) -> io::Result<()> {
        if let Some(t) = &self.transcript {
            t.log(ev);
        }
        if self.json {
            let obj = json!({
                "event": ev.kind(),
                "severity": ev.severity().as_str(),
                "lines": ev.lines(),
            });
            writeln!(self.out, "{obj}")
        } else {
            writeln!(self.out, "{ev}")
        }
    }

    pub fn events(&mut self, evs: &[PumpEvent]) -> io::Result<()> {
        for ev in evs {
            self.event(ev)?;
        }
        Ok(())
    }

    /// Panel-level message that did not come from the engine.
    pub fn notice(&mut self, kind: &str, severity: &str, line: &str) -> io::Result<()> {
        if let Some(t) = &self.transcript {
            t.line(severity, line);
        }
        if self.json {
            let obj = json!({ "event": kind, "severity": severity, "lines": [line] });
            writeln!(self.out, "{obj}")
        } else {
            writeln!(self.out, "{line}")
        }
    }

    pub fn warning(&mut self, line: &str) -> io::Result<()> {
        self.notice("panel_warning", "warning", line)
    }

    /// Raw text, suppressed in JSON mode.
    pub fn text(&mut self, s: &str) -> io::Result<()> {
        if self.json {
            return Ok(());
        }
        writeln!(self.out, "{s}")
    }

    /// Prompt without newline, flushed so it shows before input is read.
    pub fn prompt(&mut self, s: &str) -> io::Result<()> {
        if self.json {
            return Ok(());
        }
        write!(self.out, "{s}")?;
        self.out.flush()
    }

    pub fn summary(&mut self, s: &RunSummary, ctx: &SummaryContext) -> io::Result<()> {
        if self.json {
            let obj = json!({
                "timestamp": unix_now(),
                "outcome": s.outcome.as_str(),
                "ticks": s.ticks,
                "elapsed_ms": s.elapsed_ms,
                "volume_infused_ml": s.volume_infused_ml,
                "volume_to_infuse_ml": s.volume_to_infuse_ml,
                "rate_ml_per_hour": ctx.rate_ml_per_hour,
                "duration_s": ctx.duration_seconds,
                "privileged": ctx.privileged,
                "underdose_detected": ctx.underdose_detected,
            });
            return writeln!(self.out, "{obj}");
        }
        writeln!(self.out, "--- Infusion Summary ---")?;
        writeln!(self.out, "Outcome: {}", s.outcome.as_str())?;
        writeln!(self.out, "Ticks: {}", s.ticks)?;
        writeln!(self.out, "Elapsed time: {}", format_elapsed(s.elapsed_ms))?;
        writeln!(self.out, "Volume infused: {:.2} ml", s.volume_infused_ml)?;
        writeln!(self.out, "Volume to infuse: {:.2} ml", s.volume_to_infuse_ml)?;
        if ctx.underdose_detected {
            writeln!(self.out, "Underdose notice raised during this run")?;
        }
        writeln!(self.out, "------------------------")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Engine facts reported next to the driver summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryContext {
    pub rate_ml_per_hour: u32,
    pub duration_seconds: u64,
    pub privileged: bool,
    pub underdose_detected: bool,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
