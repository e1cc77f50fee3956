//! Line-oriented operator console (menu-driven, like the firmware's serial UI).

use std::io::{self, BufRead, Write};

use pump_core::PumpEngine;
use pump_core::delivery;

use crate::output::Printer;
use crate::panel::{self, format_elapsed};

const MENU: &str = "\n=== SPQR Infusion Pump Control System ===
1. Set Infusion Rate
2. Set Volume to Infuse
3. Set Duration
4. Start Infusion
5. Run Infusion Cycle
6. Stop Infusion
7. Reset Pump
8. Admin Access
9. Show Status
0. Exit";

const ADMIN_MENU: &str = "\n=== Admin Menu ===
1. Set Custom Parameters
2. Return to Main Menu";

pub struct Console<'a, R: BufRead, W: Write> {
    engine: &'a mut PumpEngine,
    input: R,
    out: Printer<W>,
    cycle_ms: u64,
    authenticated: bool,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(engine: &'a mut PumpEngine, input: R, out: Printer<W>, cycle_ms: u64) -> Self {
        Self {
            engine,
            input,
            out,
            cycle_ms: cycle_ms.max(1),
            authenticated: false,
        }
    }

    /// Read one trimmed line; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim().to_string()))
    }

    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.out.prompt(prompt)?;
        self.read_line()
    }

    /// Prompt for a number. `Ok(None)` at end of input; invalid text is
    /// reported and yields `Ok(Some(None))`.
    fn ask_number<T: std::str::FromStr>(&mut self, prompt: &str) -> io::Result<Option<Option<T>>> {
        let Some(line) = self.ask(prompt)? else {
            return Ok(None);
        };
        match line.parse::<T>() {
            Ok(v) => Ok(Some(Some(v))),
            Err(_) => {
                self.out
                    .notice("invalid_input", "error", "Invalid input. Please enter a number.")?;
                Ok(Some(None))
            }
        }
    }

    fn flush_events(&mut self) -> io::Result<()> {
        let events = self.engine.drain_events();
        self.out.events(&events)
    }

    pub fn status(&mut self) -> io::Result<()> {
        let e = &*self.engine;
        let lines = [
            "\n--- Current Pump Status ---".to_string(),
            format!("Patient ID: {}", e.patient_id()),
            format!("Medication: {}", e.medication()),
            format!("Rate: {} ml/hr", e.rate_ml_per_hour()),
            format!("Volume to infuse: {:.2} ml", e.volume_to_infuse_ml()),
            format!("Volume infused: {:.2} ml", e.volume_infused_ml()),
            format!("Duration: {} seconds", e.duration_seconds()),
            format!(
                "Status: {}",
                if e.is_running() { "Running" } else { "Stopped" }
            ),
            format!(
                "Mode: {}",
                if e.is_privileged_mode() {
                    "Admin"
                } else {
                    "Normal"
                }
            ),
            format!("Elapsed time: {}", format_elapsed(e.elapsed_time_ms())),
            "---------------------------".to_string(),
        ];
        for l in &lines {
            self.out.text(l)?;
        }
        Ok(())
    }

    /// Run until the operator exits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        self.engine.initialize();
        self.flush_events()?;

        loop {
            self.out.text(MENU)?;
            let Some(choice) = self.ask("Enter choice: ")? else {
                break;
            };
            tracing::debug!(choice = %choice, "console command");
            match choice.as_str() {
                "1" => {
                    if let Some(Some(rate)) = self.ask_number::<u32>("Enter rate (ml/hr): ")? {
                        panel::apply_rate(self.engine, rate, &mut self.out)?;
                    }
                }
                "2" => {
                    if let Some(Some(volume)) = self.ask_number::<f64>("Enter volume (ml): ")? {
                        panel::apply_volume(self.engine, volume, &mut self.out)?;
                    }
                }
                "3" => {
                    if let Some(Some(s)) = self.ask_number::<u64>("Enter duration (seconds): ")? {
                        panel::apply_duration(self.engine, s, &mut self.out)?;
                    }
                }
                "4" => {
                    self.engine.start();
                    self.flush_events()?;
                }
                "5" => self.run_cycle()?,
                "6" => {
                    if !self.engine.stop() {
                        self.out
                            .notice("not_running", "normal", "Pump is not running")?;
                    }
                    self.flush_events()?;
                }
                "7" => {
                    self.engine.initialize();
                    self.flush_events()?;
                }
                "8" => self.admin()?,
                "9" => self.status()?,
                "0" => {
                    self.out.notice("exit", "normal", "Exiting program. Goodbye!")?;
                    break;
                }
                _ => {
                    self.out.notice(
                        "invalid_choice",
                        "error",
                        "Invalid choice. Please try again.",
                    )?;
                }
            }
        }

        if self.engine.stop() {
            self.flush_events()?;
        }
        self.out.flush()
    }

    /// Menu item 5: one `console_cycle_ms` slice of simulated time.
    fn run_cycle(&mut self) -> io::Result<()> {
        if !self.engine.is_running() {
            return self
                .out
                .notice("not_running", "normal", "Pump is not running");
        }
        let calc = delivery::breakdown(self.engine.rate_ml_per_hour(), self.cycle_ms);
        self.engine.advance(self.cycle_ms);
        self.flush_events()?;
        let line = format!(
            "Time elapsed: {} seconds, Volume infused: {:.2} ml",
            self.engine.elapsed_time_ms() / 1000,
            self.engine.volume_infused_ml()
        );
        self.out.notice("cycle", "normal", &line)?;
        let expected = format!("Mathematically expected volume: {:.2} ml", calc.unbounded_ml);
        self.out.notice("cycle_expected", "normal", &expected)?;
        if panel::exceeds_discrepancy(&calc) {
            self.out
                .warning("WARNING: Discrepancy detected between actual and expected volumes!")?;
        }
        Ok(())
    }

    fn admin(&mut self) -> io::Result<()> {
        if !self.authenticated {
            let Some(pw) = self.ask("Enter admin password: ")? else {
                return Ok(());
            };
            if self.engine.authorize_admin(&pw).is_err() {
                return self.out.notice(
                    "admin_denied",
                    "error",
                    "Invalid password. Access denied.",
                );
            }
            self.authenticated = true;
            self.out
                .notice("admin_authenticated", "normal", "Admin authentication successful")?;
        }

        self.out.text(ADMIN_MENU)?;
        let Some(choice) = self.ask("Enter admin choice: ")? else {
            return Ok(());
        };
        match choice.as_str() {
            "1" => {
                let Some(Some(rate)) = self.ask_number::<u32>("Enter rate (ml/hr): ")? else {
                    return Ok(());
                };
                let Some(Some(volume)) = self.ask_number::<f64>("Enter volume (ml): ")? else {
                    return Ok(());
                };
                let Some(Some(seconds)) = self.ask_number::<u64>("Enter duration (seconds): ")?
                else {
                    return Ok(());
                };
                self.engine.inject_admin_parameters(rate, volume, seconds);
                self.flush_events()?;
                panel::report_admin_parameters(self.engine, &mut self.out)
            }
            "2" => Ok(()),
            _ => self
                .out
                .notice("invalid_choice", "error", "Invalid admin choice"),
        }
    }
}
