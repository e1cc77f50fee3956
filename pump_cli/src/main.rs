#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod calc;
mod cli;
mod console;
mod error_fmt;
mod output;
mod panel;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use pump_core::logger::FileLogger;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::output::Printer;
use crate::run::{AdminInputs, PanelInputs};

fn main() {
    let code = real_main();
    std::process::exit(code);
}

fn real_main() -> i32 {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    // dropped before process::exit so buffered file logs are flushed
    let mut guard: Option<WorkerGuard> = None;
    let result = try_main(&cli, &mut guard);

    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    drop(guard);
    code
}

fn try_main(cli: &Cli, guard: &mut Option<WorkerGuard>) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    *guard = init_tracing(&cfg.logging, cli.log_level.as_deref(), cli.json)?;
    tracing::debug!(command = ?cli.cmd, "dispatching");
    dispatch(cli, &cfg)
}

fn load_config(path: Option<&Path>) -> eyre::Result<pump_config::Config> {
    match path {
        Some(p) => pump_config::load_file(p),
        None => Ok(pump_config::Config::default()),
    }
}

/// Level precedence: `--log-level`, then `RUST_LOG`, then `[logging].level`,
/// then `warn` so console output stays readable.
fn init_tracing(
    logging: &pump_config::Logging,
    cli_level: Option<&str>,
    json: bool,
) -> eyre::Result<Option<WorkerGuard>> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level).wrap_err("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(logging.level.as_deref().unwrap_or("warn"))
        }),
    };

    let (json_layer, pretty_layer) = if json {
        (
            Some(fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    };

    let (file_layer, guard) = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file:?}"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .try_init()
        .wrap_err("installing tracing subscriber")?;
    Ok(guard)
}

fn install_shutdown_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let f = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || f.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    flag
}

fn dispatch(cli: &Cli, cfg: &pump_config::Config) -> eyre::Result<()> {
    match &cli.cmd {
        Commands::Run {
            rate,
            volume,
            duration,
            drive,
        } => {
            let inputs = PanelInputs {
                rate: *rate,
                volume: *volume,
                duration: *duration,
            };
            run::run_regular(cfg, inputs, drive, cli.json, install_shutdown_flag())?;
        }
        Commands::AdminRun {
            password,
            rate,
            volume,
            duration,
            drive,
        } => {
            let inputs = AdminInputs {
                rate: *rate,
                volume: *volume,
                duration: *duration,
            };
            run::run_admin(
                cfg,
                password,
                inputs,
                drive,
                cli.json,
                install_shutdown_flag(),
            )?;
        }
        Commands::Calc { rate, time_ms } => {
            let breakdown = pump_core::delivery::breakdown(*rate, *time_ms);
            calc::render(std::io::stdout().lock(), &breakdown, cli.json)?;
        }
        Commands::Console { transcript } => {
            let mut engine = run::build_engine(cfg)?;
            let out = Printer::new(std::io::stdout(), cli.json)
                .with_transcript(transcript.as_deref().map(FileLogger::new));
            let input = std::io::stdin().lock();
            console::Console::new(&mut engine, input, out, cfg.simulation.console_cycle_ms)
                .run()?;
        }
    }
    Ok(())
}
