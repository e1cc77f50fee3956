//! `run` and `admin-run`: configure the engine, start it, drive it to the end.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use pump_core::logger::FileLogger;
use pump_core::{PumpEngine, PumpEvent, RunOutcome, RunSummary, TickDriver, TickRecord};
use pump_traits::clock::{Clock, MonotonicClock, SimClock};

use crate::cli::DriveOpts;
use crate::output::{Printer, SummaryContext};
use crate::panel;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(
        "tick limit of {ticks} reached before the target volume ({volume_infused_ml:.2} of {volume_to_infuse_ml:.2} ml)"
    )]
    TickLimit {
        ticks: u64,
        volume_infused_ml: f64,
        volume_to_infuse_ml: f64,
    },
}

/// Regular-panel parameters; `None` keeps the engine's current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelInputs {
    pub rate: Option<u32>,
    pub volume: Option<f64>,
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct AdminInputs {
    pub rate: u32,
    pub volume: f64,
    pub duration: u64,
}

pub fn build_engine(cfg: &pump_config::Config) -> eyre::Result<PumpEngine> {
    PumpEngine::builder()
        .with_config(cfg)
        .build()
        .wrap_err("building pump engine")
}

pub fn run_regular(
    cfg: &pump_config::Config,
    inputs: PanelInputs,
    drive: &DriveOpts,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let mut engine = build_engine(cfg)?;
    let mut out = printer(drive.transcript.as_deref(), json);
    engine.initialize();
    out.events(&engine.drain_events())?;

    apply_identity(&mut engine, drive);
    if let Some(rate) = inputs.rate {
        panel::apply_rate(&mut engine, rate, &mut out)?;
    }
    if let Some(volume) = inputs.volume {
        panel::apply_volume(&mut engine, volume, &mut out)?;
    }
    if let Some(seconds) = inputs.duration {
        panel::apply_duration(&mut engine, seconds, &mut out)?;
    }

    start_and_drive(cfg, &mut engine, drive, &mut out, shutdown)
}

pub fn run_admin(
    cfg: &pump_config::Config,
    password: &str,
    inputs: AdminInputs,
    drive: &DriveOpts,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let mut engine = build_engine(cfg)?;
    let mut out = printer(drive.transcript.as_deref(), json);
    engine.initialize();
    out.events(&engine.drain_events())?;

    engine.authorize_admin(password)?;
    out.notice("admin_authenticated", "normal", "Admin authentication successful")?;

    apply_identity(&mut engine, drive);
    engine.inject_admin_parameters(inputs.rate, inputs.volume, inputs.duration);
    out.events(&engine.drain_events())?;
    panel::report_admin_parameters(&engine, &mut out)?;

    start_and_drive(cfg, &mut engine, drive, &mut out, shutdown)
}

fn printer(transcript: Option<&Path>, json: bool) -> Printer<std::io::Stdout> {
    Printer::new(std::io::stdout(), json).with_transcript(transcript.map(FileLogger::new))
}

fn apply_identity(engine: &mut PumpEngine, drive: &DriveOpts) {
    if let Some(id) = &drive.patient_id {
        engine.set_patient_id(id.as_str());
    }
    if let Some(med) = &drive.medication {
        engine.set_medication(med.as_str());
    }
}

fn start_and_drive<W: Write>(
    cfg: &pump_config::Config,
    engine: &mut PumpEngine,
    drive: &DriveOpts,
    out: &mut Printer<W>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    engine.start();
    out.events(&engine.drain_events())?;

    let mut trace = match &drive.trace_csv {
        Some(path) => Some(TraceWriter::create(path)?),
        None => None,
    };

    let summary = if drive.realtime {
        let driver = configure(
            TickDriver::from_config(MonotonicClock::new(), &cfg.simulation),
            drive,
            shutdown,
        );
        drive_with(&driver, engine, out, trace.as_mut())?
    } else {
        let driver = configure(
            TickDriver::from_config(SimClock::new(), &cfg.simulation),
            drive,
            shutdown,
        );
        drive_with(&driver, engine, out, trace.as_mut())?
    };

    if let Some(t) = trace {
        t.finish()?;
    }
    Ok(summary)
}

/// Command-line cadence and cap override the `[simulation]` section.
fn configure<C: Clock>(
    mut driver: TickDriver<C>,
    drive: &DriveOpts,
    shutdown: Arc<AtomicBool>,
) -> TickDriver<C> {
    if let Some(tick_ms) = drive.tick_ms {
        driver = driver.with_tick_ms(tick_ms);
    }
    if let Some(max_ticks) = drive.max_ticks {
        driver = driver.with_max_ticks(max_ticks);
    }
    driver.with_shutdown(shutdown)
}

fn drive_with<C: Clock, W: Write>(
    driver: &TickDriver<C>,
    engine: &mut PumpEngine,
    out: &mut Printer<W>,
    mut trace: Option<&mut TraceWriter>,
) -> eyre::Result<RunSummary> {
    let mut first_err: Option<eyre::Report> = None;
    let mut underdose_detected = false;

    let summary = driver.run(engine, |rec, events| {
        if first_err.is_some() {
            return;
        }
        underdose_detected |= events
            .iter()
            .any(|e| matches!(e, PumpEvent::UnderdoseAnomaly(_)));
        if let Err(e) = out.events(events) {
            first_err = Some(eyre::Report::new(e).wrap_err("writing console output"));
            return;
        }
        if let Some(t) = trace.as_deref_mut()
            && let Err(e) = t.row(rec)
        {
            first_err = Some(e);
        }
    });
    if let Some(e) = first_err {
        return Err(e);
    }

    // events raised while stopping (shutdown, tick limit)
    out.events(&engine.drain_events())?;

    let ctx = SummaryContext {
        rate_ml_per_hour: engine.rate_ml_per_hour(),
        duration_seconds: engine.duration_seconds(),
        privileged: engine.is_privileged_mode(),
        underdose_detected,
    };
    out.summary(&summary, &ctx)?;
    out.flush()?;

    if summary.outcome == RunOutcome::TickLimit {
        return Err(RunError::TickLimit {
            ticks: summary.ticks,
            volume_infused_ml: summary.volume_infused_ml,
            volume_to_infuse_ml: summary.volume_to_infuse_ml,
        }
        .into());
    }
    Ok(summary)
}

/// Per-tick CSV export.
pub struct TraceWriter {
    inner: csv::Writer<std::fs::File>,
}

impl TraceWriter {
    pub const HEADER: [&'static str; 7] = [
        "tick",
        "elapsed_ms",
        "delta_ms",
        "delivered_ml",
        "volume_infused_ml",
        "volume_to_infuse_ml",
        "wrapped",
    ];

    pub fn create(path: &Path) -> eyre::Result<Self> {
        let mut inner = csv::Writer::from_path(path)
            .wrap_err_with(|| format!("create trace CSV {}", path.display()))?;
        inner.write_record(Self::HEADER)?;
        Ok(Self { inner })
    }

    pub fn row(&mut self, rec: &TickRecord) -> eyre::Result<()> {
        self.inner.write_record([
            rec.tick.to_string(),
            rec.elapsed_ms.to_string(),
            rec.delta_ms.to_string(),
            format!("{:.9}", rec.delivered_ml),
            format!("{:.9}", rec.volume_infused_ml),
            format!("{:.9}", rec.volume_to_infuse_ml),
            rec.wrapped.to_string(),
        ])?;
        Ok(())
    }

    pub fn finish(mut self) -> eyre::Result<()> {
        self.inner.flush().wrap_err("flush trace CSV")?;
        Ok(())
    }
}
